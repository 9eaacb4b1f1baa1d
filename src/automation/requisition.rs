// src/automation/requisition.rs

use super::{QueryAutomation, QueryError};
use crate::driver::Locator;
use crate::extract::extract_element;
use crate::session::Browser;
use crate::table::{RowRef, Table};
use crate::validate::Requirements;
use tracing::debug;
use url::Url;

pub const NAME: &str = "requisitions";
pub const REQUESTOR_HEADER: &str = "requestor ID";
pub const REQUISITION_HEADER: &str = "requisition number";

const QUERY_PAGE: &str = "REQ_History.asp";
const PAGING_PARAM: &str = "REQ_History_PagingMove";
const SHOW_ALL_LINK: &str = r#"a[href="/REQ_HistoryQ.asp?REQ_History_PagingMove=ALL"]"#;
const RESULT_TABLE: &str = r#"table[border="1"]"#;

/// Queries the requisition history page.
pub struct RequisitionHistory {
    query_url: String,
    requirements: Requirements,
}

impl RequisitionHistory {
    pub fn new(base_url: &str) -> Self {
        let headers = [REQUESTOR_HEADER, REQUISITION_HEADER];
        Self {
            query_url: format!("{}/{}", base_url.trim_end_matches('/'), QUERY_PAGE),
            requirements: Requirements::new(
                format!(
                    "Input file should be in CSV format, with the following columns: {:?}",
                    headers
                ),
                headers,
            ),
        }
    }
}

/// True if the result page already lists every row instead of one page.
fn shows_all(url: &str) -> bool {
    Url::parse(url)
        .map(|u| {
            u.query_pairs().any(|(k, v)| {
                k.eq_ignore_ascii_case(PAGING_PARAM) && v.eq_ignore_ascii_case("ALL")
            })
        })
        .unwrap_or(false)
}

impl QueryAutomation for RequisitionHistory {
    fn name(&self) -> &str {
        "PSReports Requisitions"
    }

    fn description(&self) -> &str {
        "Queries the PeopleSoft requisition history page."
    }

    fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    fn query_url(&self) -> Option<&str> {
        Some(&self.query_url)
    }

    fn submit_query(&self, browser: &mut Browser<'_>, row: RowRef<'_>) -> Result<(), QueryError> {
        let requestor = browser.await_element(&Locator::name("REQUESTOR_ID"))?;
        browser.send_input(&requestor, row.get(REQUESTOR_HEADER)?)?;
        let req_no = browser.await_element(&Locator::name("REQ_NO"))?;
        browser.send_input(&req_no, row.get(REQUISITION_HEADER)?)?;
        let query = browser.await_element(&Locator::name("Query"))?;
        browser.click(&query)?;
        Ok(())
    }

    fn read_result(&self, browser: &mut Browser<'_>) -> Result<Table, QueryError> {
        let url = browser.current_url()?;
        let expand = !shows_all(&url);
        debug!(%url, expand, "reading requisition result");
        if expand {
            let link = browser.await_element(&Locator::css(SHOW_ALL_LINK))?;
            browser.click(&link)?;
        }
        let table = browser.await_element(&Locator::css(RESULT_TABLE))?;
        Ok(extract_element(&table, None)?)
    }
}
