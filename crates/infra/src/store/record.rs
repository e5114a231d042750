use serde::{Deserialize, Serialize};

use wareflow_approvals::{ChangeRequest, ChangeRequestId};
use wareflow_catalog::{CatalogRecord, EntityRef};
use wareflow_storage::{StockItem, StockItemId, Warehouse, WarehouseId, Zone, ZoneId};
use wareflow_transfers::{TransferId, TransferRequest};

/// Address of a stored record.
///
/// Keys are totally ordered so lock sets can be acquired in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "table", content = "id", rename_all = "snake_case")]
pub enum RecordKey {
    Warehouse(WarehouseId),
    Zone(ZoneId),
    Stock(StockItemId),
    Catalog(EntityRef),
    ChangeRequest(ChangeRequestId),
    Transfer(TransferId),
}

impl core::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordKey::Warehouse(id) => write!(f, "warehouse:{id}"),
            RecordKey::Zone(id) => write!(f, "zone:{id}"),
            RecordKey::Stock(id) => write!(f, "stock:{id}"),
            RecordKey::Catalog(r) => write!(f, "{r}"),
            RecordKey::ChangeRequest(id) => write!(f, "change_request:{id}"),
            RecordKey::Transfer(id) => write!(f, "transfer:{id}"),
        }
    }
}

/// Any record the engine persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", content = "record", rename_all = "snake_case")]
pub enum Record {
    Warehouse(Warehouse),
    Zone(Zone),
    Stock(StockItem),
    Catalog(CatalogRecord),
    ChangeRequest(ChangeRequest),
    Transfer(TransferRequest),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Warehouse(w) => RecordKey::Warehouse(w.id_typed()),
            Record::Zone(z) => RecordKey::Zone(z.id_typed()),
            Record::Stock(s) => RecordKey::Stock(s.id_typed()),
            Record::Catalog(c) => RecordKey::Catalog(c.entity_ref()),
            Record::ChangeRequest(r) => RecordKey::ChangeRequest(r.id_typed()),
            Record::Transfer(t) => RecordKey::Transfer(t.id_typed()),
        }
    }
}

/// A record together with the store's row version.
///
/// Versions start at 1 on insert and grow by one on every committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, value: T) -> Self {
        Self { version, value }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            version: self.version,
            value: f(self.value),
        }
    }
}

macro_rules! record_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Record {
                fn from(value: $ty) -> Self {
                    Record::$variant(value)
                }
            }

            impl TryFrom<Record> for $ty {
                type Error = Record;

                fn try_from(value: Record) -> Result<Self, Self::Error> {
                    match value {
                        Record::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

record_conversions!(
    Warehouse => Warehouse,
    Zone => Zone,
    Stock => StockItem,
    Catalog => CatalogRecord,
    ChangeRequest => ChangeRequest,
    Transfer => TransferRequest,
);
