//! Company listing and client-side filtering.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ports::market_api::MarketApi;

/// Id given to a company that came from the live symbol search.
pub const LIVE_COMPANY_ID: i64 = 9999;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub sector: String,
    /// True when the company was resolved through the backend search rather
    /// than the static list.
    pub from_api: bool,
}

/// A row of the backend's `/companies/` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub market_cap: Option<i64>,
    #[serde(default)]
    pub sector: Option<String>,
}

/// A row of `/companies/top10`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCompany {
    #[serde(alias = "id")]
    pub company_id: i64,
    #[serde(default, alias = "company_name")]
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Result of `/search/{query}` when the backend found something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub sector: Option<String>,
}

impl SearchHit {
    pub fn into_company(self) -> Option<Company> {
        let symbol = self.symbol.trim().to_string();
        if symbol.is_empty() {
            return None;
        }
        let name = if self.name.trim().is_empty() {
            symbol.clone()
        } else {
            self.name
        };
        Some(Company {
            id: LIVE_COMPANY_ID,
            name,
            symbol,
            sector: self
                .sector
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            from_api: true,
        })
    }
}

const NIFTY_50: [(&str, &str, &str); 50] = [
    ("Reliance Industries", "RELIANCE.NS", "Energy"),
    ("Tata Consultancy Services", "TCS.NS", "Information Technology"),
    ("HDFC Bank", "HDFCBANK.NS", "Financial Services"),
    ("ICICI Bank", "ICICIBANK.NS", "Financial Services"),
    ("Infosys", "INFY.NS", "Information Technology"),
    ("Bharti Airtel", "BHARTIARTL.NS", "Telecommunication"),
    ("State Bank of India", "SBIN.NS", "Financial Services"),
    ("Hindustan Unilever", "HINDUNILVR.NS", "FMCG"),
    ("ITC", "ITC.NS", "FMCG"),
    ("Larsen & Toubro", "LT.NS", "Construction"),
    ("Bajaj Finance", "BAJFINANCE.NS", "Financial Services"),
    ("HCL Technologies", "HCLTECH.NS", "Information Technology"),
    ("Kotak Mahindra Bank", "KOTAKBANK.NS", "Financial Services"),
    ("Axis Bank", "AXISBANK.NS", "Financial Services"),
    ("Maruti Suzuki", "MARUTI.NS", "Automobile"),
    ("Sun Pharmaceutical", "SUNPHARMA.NS", "Healthcare"),
    ("Mahindra & Mahindra", "M&M.NS", "Automobile"),
    ("Titan Company", "TITAN.NS", "Consumer Durables"),
    ("NTPC", "NTPC.NS", "Power"),
    ("Asian Paints", "ASIANPAINT.NS", "Consumer Durables"),
    ("UltraTech Cement", "ULTRACEMCO.NS", "Construction Materials"),
    ("Oil & Natural Gas Corporation", "ONGC.NS", "Energy"),
    ("Tata Motors", "TATAMOTORS.NS", "Automobile"),
    ("Power Grid Corporation", "POWERGRID.NS", "Power"),
    ("Adani Enterprises", "ADANIENT.NS", "Metals & Mining"),
    ("Adani Ports and SEZ", "ADANIPORTS.NS", "Services"),
    ("Bajaj Finserv", "BAJAJFINSV.NS", "Financial Services"),
    ("Coal India", "COALINDIA.NS", "Energy"),
    ("Tata Steel", "TATASTEEL.NS", "Metals & Mining"),
    ("JSW Steel", "JSWSTEEL.NS", "Metals & Mining"),
    ("Nestle India", "NESTLEIND.NS", "FMCG"),
    ("Wipro", "WIPRO.NS", "Information Technology"),
    ("Tech Mahindra", "TECHM.NS", "Information Technology"),
    ("Grasim Industries", "GRASIM.NS", "Construction Materials"),
    ("IndusInd Bank", "INDUSINDBK.NS", "Financial Services"),
    ("Hindalco Industries", "HINDALCO.NS", "Metals & Mining"),
    ("Cipla", "CIPLA.NS", "Healthcare"),
    ("Dr. Reddy's Laboratories", "DRREDDY.NS", "Healthcare"),
    ("SBI Life Insurance", "SBILIFE.NS", "Financial Services"),
    ("HDFC Life Insurance", "HDFCLIFE.NS", "Financial Services"),
    ("Britannia Industries", "BRITANNIA.NS", "FMCG"),
    ("Eicher Motors", "EICHERMOT.NS", "Automobile"),
    ("Bajaj Auto", "BAJAJ-AUTO.NS", "Automobile"),
    ("Hero MotoCorp", "HEROMOTOCO.NS", "Automobile"),
    ("Apollo Hospitals", "APOLLOHOSP.NS", "Healthcare"),
    ("Divi's Laboratories", "DIVISLAB.NS", "Healthcare"),
    ("Tata Consumer Products", "TATACONSUM.NS", "FMCG"),
    ("Bharat Petroleum", "BPCL.NS", "Energy"),
    ("Shriram Finance", "SHRIRAMFIN.NS", "Financial Services"),
    ("LTIMindtree", "LTIM.NS", "Information Technology"),
];

/// The fixed NIFTY 50 list, with ids 1..=50 in index order.
pub fn nifty50() -> Vec<Company> {
    NIFTY_50
        .iter()
        .enumerate()
        .map(|(i, (name, symbol, sector))| Company {
            id: i as i64 + 1,
            name: name.to_string(),
            symbol: symbol.to_string(),
            sector: sector.to_string(),
            from_api: false,
        })
        .collect()
}

pub fn find_company(id: i64) -> Option<Company> {
    nifty50().into_iter().find(|c| c.id == id)
}

/// The static company with `id`, or else a live company rebuilt from the
/// symbol (and name) a view was linked with.
pub fn lookup_company(id: i64, symbol: Option<&str>, name: Option<&str>) -> Option<Company> {
    if let Some(company) = find_company(id) {
        return Some(company);
    }
    let hit = SearchHit {
        name: name.unwrap_or_default().to_string(),
        symbol: symbol.unwrap_or_default().to_string(),
        sector: None,
    };
    hit.into_company().map(|c| Company { id, ..c })
}

/// Case-insensitive substring filter on name AND sector.
///
/// Blank needles match everything; when both are blank the list is returned
/// untouched.
pub fn filter_companies(companies: &[Company], name: &str, sector: &str) -> Vec<Company> {
    let name = name.trim().to_lowercase();
    let sector = sector.trim().to_lowercase();
    if name.is_empty() && sector.is_empty() {
        return companies.to_vec();
    }
    companies
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&name) && c.sector.to_lowercase().contains(&sector))
        .cloned()
        .collect()
}

/// Name/sector search box state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompanyFilter<'a> {
    pub name: &'a str,
    pub sector: &'a str,
}

impl<'a> CompanyFilter<'a> {
    pub fn new(name: &'a str, sector: &'a str) -> Self {
        Self { name, sector }
    }

    /// Whether a local miss will fall back to the live search.
    pub fn searches_live(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Filter locally, falling back to the backend search when nothing
    /// matched and a name was typed.
    pub async fn resolve(&self, companies: &[Company], api: &dyn MarketApi) -> Vec<Company> {
        let filtered = filter_companies(companies, self.name, self.sector);
        if !filtered.is_empty() || !self.searches_live() {
            return filtered;
        }

        match api.search_symbol(self.name.trim()).await {
            Ok(Some(hit)) => hit.into_company().into_iter().collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(query = self.name, error = %e, "live symbol search failed");
                Vec::new()
            }
        }
    }
}
