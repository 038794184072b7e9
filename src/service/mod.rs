pub mod command;
pub mod keyed_lock;
pub mod partner_token;
pub mod proxy_pipeline;
pub mod user_tokens;

pub use partner_token::PartnerTokenCache;
pub use proxy_pipeline::ProxyPipeline;
pub use user_tokens::UserTokenManager;
