pub mod authors;
pub mod comments;
pub mod pagination;
pub mod posts;
pub mod slug;
pub mod syndication;
pub mod tags;
