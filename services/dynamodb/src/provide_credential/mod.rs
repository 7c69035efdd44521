mod session_token;
pub use session_token::SessionTokenCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;
