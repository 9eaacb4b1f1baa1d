// src/automation/purchase_order.rs

use super::{QueryAutomation, QueryError};
use crate::driver::Locator;
use crate::extract::extract_element;
use crate::session::Browser;
use crate::table::{RowRef, Table};
use crate::validate::Requirements;

pub const NAME: &str = "blanket-po";
pub const BPO_HEADER: &str = "BPO ID";
pub const BALANCE_HEADER: &str = "PO Balance";

const QUERY_PAGE: &str = "PurchaseOrderInformation.asp";
const RESULT_TABLE: &str = r#"table[border="1"]"#;

/// Reads the remaining balance of blanket purchase orders.
pub struct BlanketPurchaseOrder {
    query_url: String,
    requirements: Requirements,
}

impl BlanketPurchaseOrder {
    pub fn new(base_url: &str) -> Self {
        Self {
            query_url: format!("{}/{}", base_url.trim_end_matches('/'), QUERY_PAGE),
            requirements: Requirements::new(
                "Input files should be in CSV format, and should contain at least one column, labeled 'BPO ID'",
                [BPO_HEADER],
            ),
        }
    }
}

impl QueryAutomation for BlanketPurchaseOrder {
    fn name(&self) -> &str {
        "Blanket Purchase Order Balance"
    }

    fn description(&self) -> &str {
        "Queries the PeopleSoft Purchase Order Balance Information page to extract funds remaining in blanket purchase order accounts"
    }

    fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    fn query_url(&self) -> Option<&str> {
        Some(&self.query_url)
    }

    fn submit_query(&self, browser: &mut Browser<'_>, row: RowRef<'_>) -> Result<(), QueryError> {
        let field = browser.await_element(&Locator::css(r#"input[name="PurchaseOrderNumber"]"#))?;
        browser.send_input(&field, row.get(BPO_HEADER)?)?;
        let submit = browser.await_element(&Locator::name("B1"))?;
        browser.click(&submit)?;
        Ok(())
    }

    fn read_result(&self, browser: &mut Browser<'_>) -> Result<Table, QueryError> {
        // the balance table renders no usable header row
        let table = browser.await_element(&Locator::css(RESULT_TABLE))?;
        Ok(extract_element(&table, Some(&[BALANCE_HEADER][..]))?)
    }

    fn annotate(&self, row: RowRef<'_>, mut result: Table) -> Result<Table, QueryError> {
        result.insert_column(0, BPO_HEADER, row.get(BPO_HEADER)?)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::driver::{DriverError, HttpDriver, WaitPolicy};
    use anyhow::Result;
    use std::time::Duration;

    fn session_on(page: &str) -> Result<Session> {
        let mut driver = HttpDriver::with_client(reqwest::blocking::Client::new());
        driver.load_html("https://portal.test/PurchaseOrderInformationQ.asp", page)?;
        let mut session = Session::new(WaitPolicy::new(
            Duration::from_millis(20),
            Duration::from_millis(5),
        ));
        session.start(Box::new(driver))?;
        Ok(session)
    }

    #[test]
    fn test_read_and_annotate() -> Result<()> {
        let mut session = session_on(
            r#"<table border="1">
                 <tr><td> 1204.00 </td></tr>
               </table>"#,
        )?;
        let auto = BlanketPurchaseOrder::new("https://portal.test");
        let result = auto.read_result(&mut session.browser())?;
        assert_eq!(result.header_names(), vec![BALANCE_HEADER]);
        assert_eq!(result.len(), 1);

        let input = Table::parse("BPO ID\nB-17\n")?;
        let tagged = auto.annotate(input.row(0).unwrap(), result)?;
        assert_eq!(tagged.header_names(), vec![BPO_HEADER, BALANCE_HEADER]);
        assert_eq!(tagged.row(0).unwrap().values(), ["B-17", "1204.00"]);
        Ok(())
    }

    #[test]
    fn test_wide_balance_table_is_row_error() -> Result<()> {
        let mut session = session_on(
            r#"<table border="1"><tr><td>B-17</td><td>1204.00</td></tr></table>"#,
        )?;
        let auto = BlanketPurchaseOrder::new("https://portal.test");
        let err = auto.read_result(&mut session.browser()).unwrap_err();
        assert!(matches!(err, QueryError::Table(_)));
        assert!(!err.is_fatal());
        Ok(())
    }

    #[test]
    fn test_missing_result_table_is_timeout() -> Result<()> {
        let mut session = session_on("<p>No purchase order found</p>")?;
        let auto = BlanketPurchaseOrder::new("https://portal.test");
        let err = auto.read_result(&mut session.browser()).unwrap_err();
        assert!(matches!(err, QueryError::Driver(DriverError::Timeout { .. })));
        assert!(!err.is_fatal());
        Ok(())
    }
}
