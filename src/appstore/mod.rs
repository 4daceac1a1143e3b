pub mod feed;
pub mod url;
