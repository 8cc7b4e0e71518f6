//! Static company details and UI copy served to the browser shell.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    pub name: &'static str,
    pub address: &'static str,
    pub phone: &'static str,
    pub email: &'static str,
    pub website: &'static str,
    pub logo_color: &'static str,
}

pub const COMPANY_INFO: CompanyInfo = CompanyInfo {
    name: "Texas American Trade Inc.",
    address: "5075 Westheimer Suite 799W, Houston, Texas",
    phone: "+1 (832) 238 1103",
    email: "ventas@procurademexico.com",
    website: "www.texasamericantrade.com",
    logo_color: "#1e3a8a",
};

/// Rotated by the shell while an analysis is in flight.
pub const LOADING_MESSAGES: [&str; 7] = [
    "Mapping competitor equivalents...",
    "Calculating lead priority score...",
    "Analyzing water chemistry requirements...",
    "Checking logistics for Houston-Mexico corridor...",
    "Evaluating thermal stability for HPHT conditions...",
    "Drafting technical response...",
    "Optimizing friction reducer selection...",
];

/// Milliseconds between loading message changes.
pub const LOADING_MESSAGE_INTERVAL_MS: u64 = 2500;
