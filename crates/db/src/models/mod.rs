pub mod argument;
pub mod debate;
pub mod like;
pub mod news_cache;
pub mod practice_session;
pub mod vote;
