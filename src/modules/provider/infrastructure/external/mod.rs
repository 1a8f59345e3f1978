pub mod chan;
pub mod reddit;

pub use chan::ChanClient;
pub use reddit::RedditClient;
