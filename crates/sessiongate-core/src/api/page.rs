//! Response envelopes used by the resource endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Page request folded into the query string as `_size` / `_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Pageable {
    #[serde(rename = "_size", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(rename = "_page", skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl Pageable {
    pub fn new(page_size: u32, page_number: u32) -> Self {
        Self {
            page_size: Some(page_size),
            page_number: Some(page_number),
        }
    }
}

/// Flat envelope: `{"data": T}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    pub data: T,
}

/// Page envelope: `{"data": [T], "totalElements": n, ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total_elements: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    /// Any other paging metadata the server sends
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Either envelope, chosen by the shape the server actually returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response<T> {
    Page(Page<T>),
    Json(JsonResponse<T>),
}

impl<T> Response<T> {
    pub fn is_page(&self) -> bool {
        matches!(self, Response::Page(_))
    }

    pub fn into_page(self) -> Option<Page<T>> {
        match self {
            Response::Page(page) => Some(page),
            Response::Json(_) => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Response::Json(json) => Some(json.data),
            Response::Page(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pageable_query_names() {
        let query = serde_json::to_value(Pageable::new(20, 3)).unwrap();
        assert_eq!(query, json!({ "_size": 20, "_page": 3 }));

        let empty = serde_json::to_value(Pageable::default()).unwrap();
        assert_eq!(empty, json!({}));
    }

    #[test]
    fn test_page_shape_is_detected() {
        let body = json!({ "data": [1, 2, 3], "totalElements": 30, "totalPages": 10, "sort": "id" });
        let response: Response<i32> = serde_json::from_value(body).unwrap();
        let page = response.into_page().unwrap();
        assert_eq!(page.data, vec![1, 2, 3]);
        assert_eq!(page.total_elements, 30);
        assert_eq!(page.total_pages, Some(10));
        assert_eq!(page.extra["sort"], "id");
    }

    #[test]
    fn test_flat_shape_is_detected() {
        let response: Response<Value> = serde_json::from_value(json!({ "data": { "id": 1 } })).unwrap();
        assert!(!response.is_page());
        assert_eq!(response.into_data().unwrap()["id"], 1);
    }

    #[test]
    fn test_list_without_total_is_flat() {
        let response: Response<Vec<i32>> = serde_json::from_value(json!({ "data": [1, 2] })).unwrap();
        assert_eq!(response.into_data(), Some(vec![1, 2]));
    }
}
