pub mod extractor;
pub mod json;
pub mod jwt;
pub mod test_utils;
pub mod validation;
