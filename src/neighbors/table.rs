use once_cell::sync::Lazy;

use crate::acquisition::path::Path;

/// lldpRemTable
pub static LLDP_ROOT: Lazy<Path> = Lazy::new(|| Path::new(vec![1, 0, 8802, 1, 1, 2, 1, 4]));
/// cdpCacheTable
pub static CDP_ROOT: Lazy<Path> =
    Lazy::new(|| Path::new(vec![1, 3, 6, 1, 4, 1, 9, 9, 23, 1, 2, 1]));
/// ifName
pub static IF_NAME_ROOT: Lazy<Path> =
    Lazy::new(|| Path::new(vec![1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1]));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    RemotePortLabel,
    LocalInterfaceRef,
    RemoteDeviceId,
}

/// Where one neighbor table lives and which of its columns matter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborTable {
    pub name: &'static str,
    pub root: Path,
    /// Components between the root and the column number
    entry: Vec<u64>,
    columns: Vec<(u64, Column)>,
    /// Row index component that carries the local interface index, for tables without such a column
    local_ref_in_index: Option<usize>,
}

/// A binding that landed in a recognized column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell<'a> {
    pub column: Column,
    pub row: &'a [u64],
}

impl NeighborTable {
    /// lldpRemEntry: port id (7), local port number (2), system name (9).
    pub fn lldp() -> Self {
        Self {
            name: "lldp",
            root: LLDP_ROOT.clone(),
            entry: vec![1, 1],
            columns: vec![
                (7, Column::RemotePortLabel),
                (2, Column::LocalInterfaceRef),
                (9, Column::RemoteDeviceId),
            ],
            local_ref_in_index: None,
        }
    }

    /// cdpCacheEntry: device port (7), device id (6). Rows are indexed by cdpCacheIfIndex.cdpCacheDeviceIndex.
    pub fn cdp() -> Self {
        Self {
            name: "cdp",
            root: CDP_ROOT.clone(),
            entry: vec![1],
            columns: vec![(7, Column::RemotePortLabel), (6, Column::RemoteDeviceId)],
            local_ref_in_index: Some(0),
        }
    }

    pub fn standard() -> Vec<Self> {
        vec![Self::lldp(), Self::cdp()]
    }

    /// Column and row index of `path`, or `None` when it is outside the entry or in a column we skip.
    pub fn classify<'a>(&self, path: &'a Path) -> Option<Cell<'a>> {
        let suffix = path.suffix_after(&self.root)?;
        let rest = suffix.strip_prefix(self.entry.as_slice())?;
        let (column_id, row) = rest.split_first()?;
        let column = self
            .columns
            .iter()
            .find(|(id, _)| id == column_id)
            .map(|(_, column)| *column)?;
        Some(Cell { column, row })
    }

    /// Local interface index encoded in a row index, if this table keeps it there.
    pub fn local_ref_from_row(&self, row: &[u64]) -> Option<String> {
        self.local_ref_in_index
            .and_then(|position| row.get(position))
            .map(|component| component.to_string())
    }
}
