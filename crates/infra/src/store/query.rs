//! Filters and pagination for list queries.

use serde::{Deserialize, Serialize};

use wareflow_approvals::RequestStatus;
use wareflow_catalog::{ApprovalState, EntityKind, EntityRef};
use wareflow_core::UserId;
use wareflow_storage::{WarehouseId, ZoneId};
use wareflow_transfers::{TransferDestination, TransferKind, TransferStatus};

use super::record::Record;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self::bounded(limit, offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    /// A missing or zero limit becomes `default`; larger ones are capped at `max`.
    pub fn bounded(limit: Option<u32>, offset: Option<u32>, default: u32, max: u32) -> Self {
        let limit = match limit {
            Some(0) | None => default,
            Some(l) => l,
        };
        Self {
            limit: limit.min(max),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Caller-supplied paging; bounded by configuration before it reaches the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matches across all pages.
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            pagination: self.pagination,
            has_more: self.has_more,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequestFilter {
    pub status: Option<RequestStatus>,
    pub kind: Option<EntityKind>,
    pub target: Option<EntityRef>,
    pub submitted_by: Option<UserId>,
}

impl ChangeRequestFilter {
    pub fn pending_for(target: EntityRef) -> Self {
        Self {
            status: Some(RequestStatus::Pending),
            target: Some(target),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFilter {
    pub status: Option<TransferStatus>,
    pub kind: Option<TransferKind>,
    pub submitted_by: Option<UserId>,
    /// Transfers leaving or arriving at this warehouse.
    pub warehouse: Option<WarehouseId>,
}

/// Selects one table and narrows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordFilter {
    Warehouses,
    Zones { warehouse: Option<WarehouseId> },
    Stock { zone: Option<ZoneId> },
    Catalog { kind: Option<EntityKind>, approval: Option<ApprovalState> },
    ChangeRequests(ChangeRequestFilter),
    Transfers(TransferFilter),
}

fn matches_opt<T: PartialEq>(wanted: &Option<T>, actual: T) -> bool {
    wanted.as_ref().is_none_or(|w| *w == actual)
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        match (self, record) {
            (RecordFilter::Warehouses, Record::Warehouse(_)) => true,
            (RecordFilter::Zones { warehouse }, Record::Zone(z)) => matches_opt(warehouse, z.warehouse_id()),
            (RecordFilter::Stock { zone }, Record::Stock(s)) => matches_opt(zone, s.zone_id()),
            (RecordFilter::Catalog { kind, approval }, Record::Catalog(c)) => {
                matches_opt(kind, c.kind()) && matches_opt(approval, c.approval())
            }
            (RecordFilter::ChangeRequests(f), Record::ChangeRequest(r)) => {
                r.is_submitted()
                    && matches_opt(&f.status, r.status())
                    && f.kind.is_none_or(|k| r.target().is_some_and(|t| t.kind == k))
                    && f.target.is_none_or(|t| r.target() == Some(t))
                    && f.submitted_by.is_none_or(|u| r.submitted_by() == Some(u))
            }
            (RecordFilter::Transfers(f), Record::Transfer(t)) => {
                t.is_submitted()
                    && matches_opt(&f.status, t.status())
                    && f.kind.is_none_or(|k| t.kind() == Some(k))
                    && f.submitted_by.is_none_or(|u| t.submitted_by() == Some(u))
                    && f.warehouse.is_none_or(|w| {
                        t.plan().is_some_and(|p| {
                            p.source_warehouse == w || p.destination == TransferDestination::Warehouse(w)
                        })
                    })
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_caps() {
        assert_eq!(Pagination::new(None, None), Pagination { limit: 50, offset: 0 });
        assert_eq!(Pagination::new(Some(0), Some(3)).limit, 50);
        assert_eq!(Pagination::new(Some(10_000), None).limit, 500);
        assert_eq!(Pagination::bounded(Some(30), None, 10, 20).limit, 20);
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn bounded_limit_is_never_zero_nor_above_max(
            limit in proptest::option::of(0u32..10_000),
            offset in proptest::option::of(0u32..10_000),
            max in 1u32..1_000,
            default_frac in 0.0f64..=1.0,
        ) {
            let default = ((f64::from(max) * default_frac) as u32).clamp(1, max);
            let page = Pagination::bounded(limit, offset, default, max);
            prop_assert!(page.limit >= 1);
            prop_assert!(page.limit <= max);
            prop_assert_eq!(page.offset, offset.unwrap_or(0));
        }
    }
}
