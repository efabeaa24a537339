// Server configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_DATA_PATH: &str = "data";

// Storage files, relative to the data path
pub const LEDGER_FILE_NAME: &str = "expenses.json";
pub const RATES_FILE_NAME: &str = "exchange_rates.json";
pub const EXPORT_VERSION: &str = "1.0";

// Rate refresh
pub const DEFAULT_RATE_STALENESS_HOURS: u64 = 4;
pub const DEFAULT_RATE_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PRIMARY_RATE_URL: &str = "https://api.exchangerate-api.com/v4/latest/{base}";
pub const DEFAULT_SECONDARY_RATE_URL: &str = "https://open.er-api.com/v6/latest/{base}";
pub const RATE_WORKER_PERIOD_SECS: u64 = 15 * 60;

// Parties
pub const DEFAULT_PARTY_A_NAME: &str = "Sunil";
pub const DEFAULT_PARTY_B_NAME: &str = "Shirin";
pub const DEFAULT_PARTY_A_HOME: &str = "GBP";
pub const DEFAULT_PARTY_B_HOME: &str = "AED";

// Catalogs accepted by the HTTP layer
pub const CITIES: &[&str] = &[
    "Abu Dhabi",
    "Beijing",
    "Shanghai",
    "Guilin",
    "Chengdu",
    "Chongqing",
    "London",
    "Yangshuo",
];

pub const CATEGORIES: &[&str] = &[
    "Official Stuff",
    "Transportation",
    "Accommodation",
    "Food",
    "Activities",
    "Shopping",
    "Connectivity",
    "Miscellaneous",
];

// Validation limits
pub const MAX_ACTIVITY_LENGTH: usize = 200;
pub const MAX_NOTES_LENGTH: usize = 1000;
pub const MAX_FILENAME_LENGTH: usize = 255;
pub const MAX_STORAGE_PATH_LENGTH: usize = 1024;

// Floating point tolerance used when comparing money amounts
pub const AMOUNT_EPSILON: f64 = 1e-9;

// Error messages
pub const ERR_PERSISTENCE: &str = "Failed to save ledger";
pub const ERR_EXPENSE_NOT_FOUND: &str = "Expense not found";
pub const ERR_DOCUMENT_NOT_FOUND: &str = "Document not found";
pub const ERR_NO_CHANGES: &str = "No changes provided";
