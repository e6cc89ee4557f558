pub mod token;

pub use token::tokens_match;
