/// One reconciliation instruction, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
  pub part_number: String,
  pub counted_quantity: i64,
  pub notes: String,
}

/// Server verdict on a single count item update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResponse {
  pub success: bool,
  pub error: Option<String>,
}

#[cfg(test)]
impl UpdateResponse {
  pub fn ok() -> Self {
    Self {
      success: true,
      error: None,
    }
  }

  pub fn rejected(error: impl Into<String>) -> Self {
    Self {
      success: false,
      error: Some(error.into()),
    }
  }
}

/// Stock count header
#[derive(Debug, Clone)]
pub struct StockCount {
  pub id: u64,
  pub count_number: String,
  pub warehouse: Option<String>,
  pub status: String, // "pending", "in_progress" or "completed"
  pub count_type: Option<String>,
  pub total_items: i64,
  pub variance_items: i64,
}

/// One counted line of a stock count
#[derive(Debug, Clone)]
pub struct StockCountItem {
  pub part_number: String,
  pub part_name: String,
  pub unit: Option<String>,
  pub system_quantity: i64,
  pub counted_quantity: Option<i64>,
  pub variance_quantity: Option<i64>,
  pub notes: Option<String>,
}

/// Server-confirmed state of a stock count
#[derive(Debug, Clone)]
pub struct StockCountDetail {
  pub count: StockCount,
  pub items: Vec<StockCountItem>,
}
