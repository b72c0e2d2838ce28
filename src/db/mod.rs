//! Database layer (record store adapters and typed repository).

pub mod firestore;
pub mod memory;
pub mod record;
pub mod repository;
pub mod store;

pub use firestore::FirestoreStore;
pub use memory::InMemoryStore;
pub use record::{DocRef, Document, Fields, Filter};
pub use repository::Repository;
pub use store::RecordStore;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ADS_ACCOUNTS: &str = "adsAccounts";
    pub const ADS_ACCOUNT_VARIABLES: &str = "adsAccountVariables";
    pub const ALERTS: &str = "alerts";
    pub const ALERT_SETTINGS: &str = "alertSettings";
    pub const INVITATIONS: &str = "invitations";
    pub const PAGE_TRACKERS: &str = "pageTrackers";
    pub const DASHBOARD_DAILY: &str = "dashboardDaily";
    /// Billing-provider mirror of the company's contact/address details
    pub const STRIPE_COMPANIES: &str = "stripeCompanies";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const PAYMENT_METHODS: &str = "paymentMethods";
    pub const AUTH_TOKENS: &str = "authTokens";
}

/// Stored field names shared across collections.
pub mod fields {
    pub const USER: &str = "User";
    pub const COMPANY_ADMIN: &str = "Company Admin";
    pub const ADS_ACCOUNT: &str = "Ads Account";
    pub const SELECTED_USERS: &str = "Selected Users";
    pub const IS_CONNECTED: &str = "Is Connected";
    pub const INVITED_BY: &str = "Invited By";
    pub const INVITED_ADS_ACCOUNTS: &str = "Ads Accounts";
    pub const EMAIL: &str = "email";

    /// Fields that hold document references (single or array).
    pub const REFERENCE_FIELDS: &[&str] = &[
        USER,
        COMPANY_ADMIN,
        ADS_ACCOUNT,
        SELECTED_USERS,
        INVITED_BY,
        INVITED_ADS_ACCOUNTS,
    ];
}
