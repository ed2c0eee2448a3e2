pub mod article;
pub mod portfolio;
pub mod recommendation;
