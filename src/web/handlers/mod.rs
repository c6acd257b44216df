pub mod company_handlers;
pub mod profile_handlers;
pub mod scoring_handlers;
pub mod system_handlers;
pub mod template_handlers;
pub mod webhook_handlers;

pub use company_handlers::*;
pub use profile_handlers::*;
pub use scoring_handlers::*;
pub use system_handlers::*;
pub use template_handlers::*;
pub use webhook_handlers::*;
