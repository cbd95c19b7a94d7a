mod settings;

pub use settings::{
    AllocationSettings, AuditSettings, Command, Config, IdentityCommand, QuotaCommand, Settings,
    WebSettings,
};
