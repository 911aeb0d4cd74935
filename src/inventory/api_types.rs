//! Serde types matching the inventory API requests and responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::{Deserialize, Serialize};

use super::types::{StockCount, StockCountDetail, StockCountItem, UpdateResponse};

// ============================================================================
// Count item update by part number
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiUpdateByPartRequest<'a> {
  pub part_number: &'a str,
  pub counted_quantity: i64,
  pub notes: &'a str,
}

/// Response body of the update endpoint. Error responses carry only `error`.
#[derive(Debug, Default, Deserialize)]
pub struct ApiUpdateResponse {
  #[serde(default)]
  pub success: bool,
  pub error: Option<String>,
  pub message: Option<String>,
}

impl From<ApiUpdateResponse> for UpdateResponse {
  fn from(api: ApiUpdateResponse) -> Self {
    Self {
      success: api.success,
      error: api.error,
    }
  }
}

// ============================================================================
// Stock count detail
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiStockCountResponse {
  pub count_info: ApiCountInfo,
  #[serde(default)]
  pub details: Vec<ApiCountDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCountInfo {
  pub id: u64,
  pub count_number: String,
  pub warehouse_name: Option<String>,
  pub status: String,
  pub count_type: Option<String>,
  pub total_items: Option<i64>,
  pub variance_items: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCountDetail {
  pub part_number: Option<String>,
  pub part_name: Option<String>,
  pub unit: Option<String>,
  #[serde(default)]
  pub system_quantity: i64,
  pub counted_quantity: Option<i64>,
  pub variance_quantity: Option<i64>,
  pub notes: Option<String>,
}

impl From<ApiStockCountResponse> for StockCountDetail {
  fn from(api: ApiStockCountResponse) -> Self {
    let info = api.count_info;
    Self {
      count: StockCount {
        id: info.id,
        count_number: info.count_number,
        warehouse: info.warehouse_name,
        status: info.status,
        count_type: info.count_type,
        total_items: info.total_items.unwrap_or_default(),
        variance_items: info.variance_items.unwrap_or_default(),
      },
      items: api
        .details
        .into_iter()
        .map(|d| StockCountItem {
          part_number: d.part_number.unwrap_or_default(),
          part_name: d.part_name.unwrap_or_default(),
          unit: d.unit,
          system_quantity: d.system_quantity,
          counted_quantity: d.counted_quantity,
          variance_quantity: d.variance_quantity,
          notes: d.notes.filter(|n| !n.is_empty()),
        })
        .collect(),
    }
  }
}
