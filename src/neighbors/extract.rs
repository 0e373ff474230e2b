/*!
Turns walked LLDP/CDP bindings into neighbor records.

Each table is walked independently. A failed walk is recorded and extraction carries on with the
bindings it did get, so one bad table never hides the other.
*/

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{
    acquisition::{
        core::{ManagementSession, VarBind},
        walk::{WalkError, walk},
    },
    neighbors::{
        CorrelationPolicy, NeighborRecord,
        table::{Column, NeighborTable},
    },
};

/// Result of walking every neighbor table of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborScan {
    pub records: Vec<NeighborRecord>,
    /// Every binding returned by the walks, recognized or not
    pub observations: Vec<VarBind>,
    pub errors: Vec<WalkError>,
    /// Number of tables walked
    pub walks: usize,
}

impl NeighborScan {
    /// True when every walk failed before returning anything.
    pub fn is_total_failure(&self) -> bool {
        self.observations.is_empty() && self.errors.len() == self.walks
    }
}

/// Systems report FQDNs inconsistently, so only the first label identifies a device.
pub fn leading_token(device_id: &str) -> &str {
    device_id.split_once('.').map_or(device_id, |(head, _)| head)
}

/// Values of the recognized columns of one table, in encounter order.
#[derive(Debug, Default)]
struct Sequences {
    port_labels: Vec<String>,
    local_refs: Vec<String>,
    device_ids: Vec<String>,
}

impl Sequences {
    fn into_records(self) -> Vec<NeighborRecord> {
        let Sequences { port_labels, local_refs, device_ids } = self;
        if port_labels.len() != device_ids.len() {
            debug!(
                port_labels = port_labels.len(),
                device_ids = device_ids.len(),
                "Unequal neighbor columns, extra entries dropped"
            );
        }
        port_labels
            .into_iter()
            .zip(device_ids)
            .enumerate()
            .map(|(i, (remote_port_label, remote_device_id))| NeighborRecord {
                remote_device_id,
                remote_port_label,
                local_interface_ref: local_refs.get(i).cloned(),
            })
            .collect()
    }
}

/// Columns of one table row, keyed by the row index.
#[derive(Debug, Default)]
struct NeighborRow {
    remote_port_label: Option<String>,
    local_interface_ref: Option<String>,
    remote_device_id: Option<String>,
}

impl NeighborRow {
    fn into_record(self) -> Option<NeighborRecord> {
        Some(NeighborRecord {
            remote_device_id: self.remote_device_id?,
            remote_port_label: self.remote_port_label?,
            local_interface_ref: self.local_interface_ref,
        })
    }
}

fn render(column: Column, varbind: &VarBind) -> String {
    let text = varbind.value.to_string();
    match column {
        Column::RemoteDeviceId => leading_token(&text).to_string(),
        Column::RemotePortLabel | Column::LocalInterfaceRef => text,
    }
}

/// Walks each table in turn and correlates the recognized columns into records.
pub async fn extract_neighbors<S: ManagementSession + ?Sized>(
    session: &mut S,
    tables: &[NeighborTable],
    policy: CorrelationPolicy,
) -> NeighborScan {
    let mut scan = NeighborScan::default();
    // (table position, row index) keeps rows of different tables apart
    let mut rows: BTreeMap<(usize, Vec<u64>), NeighborRow> = BTreeMap::new();

    for (position, table) in tables.iter().enumerate() {
        let outcome = walk(&mut *session, table.root.clone()).collect().await;
        scan.walks += 1;
        debug!(table = table.name, results = outcome.bindings.len(), "Walked neighbor table");
        // Positional pairing never crosses tables
        let mut sequences = Sequences::default();

        for varbind in &outcome.bindings {
            let Some(cell) = table.classify(&varbind.path) else {
                continue;
            };
            let value = render(cell.column, varbind);
            let index_ref = table.local_ref_from_row(cell.row);

            match policy {
                CorrelationPolicy::Positional => match cell.column {
                    Column::RemotePortLabel => {
                        sequences.port_labels.push(value);
                        sequences.local_refs.extend(index_ref);
                    }
                    Column::LocalInterfaceRef => sequences.local_refs.push(value),
                    Column::RemoteDeviceId => sequences.device_ids.push(value),
                },
                CorrelationPolicy::RowIndexed => {
                    let row = rows.entry((position, cell.row.to_vec())).or_default();
                    if row.local_interface_ref.is_none() {
                        row.local_interface_ref = index_ref;
                    }
                    match cell.column {
                        Column::RemotePortLabel => row.remote_port_label = Some(value),
                        Column::LocalInterfaceRef => row.local_interface_ref = Some(value),
                        Column::RemoteDeviceId => row.remote_device_id = Some(value),
                    }
                }
            }
        }

        if policy == CorrelationPolicy::Positional {
            scan.records.extend(sequences.into_records());
        }
        scan.observations.extend(outcome.bindings);
        if let Some(error) = outcome.error {
            warn!(table = table.name, error = %error, "Neighbor walk incomplete");
            scan.errors.push(error);
        }
    }

    if policy == CorrelationPolicy::RowIndexed {
        scan.records = rows.into_values().filter_map(NeighborRow::into_record).collect();
    }
    scan
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::acquisition::{
        core::{SessionError, SnmpValue},
        mock::MockAgent,
    };

    const LLDP: &str = "1.0.8802.1.1.2.1.4.1.1";
    const CDP: &str = "1.3.6.1.4.1.9.9.23.1.2.1.1";

    fn record(device: &str, port: &str, local: Option<&str>) -> NeighborRecord {
        NeighborRecord {
            remote_device_id: device.to_string(),
            remote_port_label: port.to_string(),
            local_interface_ref: local.map(str::to_string),
        }
    }

    #[test]
    fn test_leading_token() {
        assert_eq!(leading_token("deviceY.local"), "deviceY");
        assert_eq!(leading_token("core-sw1.example.net"), "core-sw1");
        assert_eq!(leading_token("plain"), "plain");
        assert_eq!(leading_token(""), "");
    }

    #[tokio::test]
    async fn test_lldp_single_neighbor() {
        let mut agent = MockAgent::new()
            .with(&format!("{LLDP}.2.0.3.1"), "3")
            .with(&format!("{LLDP}.5.0.3.1"), "chassis")
            .with(&format!("{LLDP}.7.0.3.1"), "Gi0/1")
            .with(&format!("{LLDP}.9.0.3.1"), "deviceY.local");

        let scan =
            extract_neighbors(&mut agent, &NeighborTable::standard(), CorrelationPolicy::Positional)
                .await;

        assert_eq!(scan.records, [record("deviceY", "Gi0/1", Some("3"))]);
        assert_eq!(scan.observations.len(), 4);
        assert!(scan.errors.is_empty());
        assert_eq!(scan.walks, 2);
    }

    #[tokio::test]
    async fn test_unequal_columns_yield_shorter_length() {
        let mut agent = MockAgent::new()
            .with(&format!("{LLDP}.7.0.3.1"), "Gi0/1")
            .with(&format!("{LLDP}.7.0.4.2"), "Gi0/2")
            .with(&format!("{LLDP}.9.0.3.1"), "deviceY");

        let scan =
            extract_neighbors(&mut agent, &NeighborTable::standard(), CorrelationPolicy::Positional)
                .await;

        assert_eq!(scan.records, [record("deviceY", "Gi0/1", None)]);
    }

    #[tokio::test]
    async fn test_cdp_neighbors_use_index_for_local_port() {
        let mut agent = MockAgent::new()
            .with(&format!("{CDP}.4.10101.1"), "10.0.0.2")
            .with(&format!("{CDP}.6.10101.1"), "edge-rtr.corp")
            .with(&format!("{CDP}.6.10102.7"), "access-sw3")
            .with(&format!("{CDP}.7.10101.1"), "GigabitEthernet0/0")
            .with(&format!("{CDP}.7.10102.7"), "FastEthernet0/24");

        let scan =
            extract_neighbors(&mut agent, &NeighborTable::standard(), CorrelationPolicy::Positional)
                .await;

        assert_eq!(
            scan.records,
            [
                record("edge-rtr", "GigabitEthernet0/0", Some("10101")),
                record("access-sw3", "FastEthernet0/24", Some("10102")),
            ]
        );
    }

    #[tokio::test]
    async fn test_positional_pairing_stays_within_each_table() {
        // LLDP has a port label with no name; it must not pick up CDP's device
        let mut agent = MockAgent::new()
            .with(&format!("{LLDP}.7.0.3.1"), "Gi0/1")
            .with(&format!("{CDP}.6.5.1"), "deviceZ")
            .with(&format!("{CDP}.7.5.1"), "Fa0/5");

        let scan =
            extract_neighbors(&mut agent, &NeighborTable::standard(), CorrelationPolicy::Positional)
                .await;

        assert_eq!(scan.records, [record("deviceZ", "Fa0/5", Some("5"))]);
    }

    #[tokio::test]
    async fn test_unequal_lldp_columns_leave_cdp_intact() {
        let mut agent = MockAgent::new()
            .with(&format!("{LLDP}.7.0.3.1"), "Gi0/1")
            .with(&format!("{LLDP}.7.0.4.2"), "Gi0/2")
            .with(&format!("{LLDP}.9.0.3.1"), "deviceY")
            .with(&format!("{CDP}.6.10101.1"), "deviceZ")
            .with(&format!("{CDP}.7.10101.1"), "Fa0/5");

        let scan =
            extract_neighbors(&mut agent, &NeighborTable::standard(), CorrelationPolicy::Positional)
                .await;

        assert_eq!(
            scan.records,
            [record("deviceY", "Gi0/1", None), record("deviceZ", "Fa0/5", Some("10101"))]
        );
    }

    #[tokio::test]
    async fn test_lldp_local_refs_do_not_shift_cdp_records() {
        let mut agent = MockAgent::new()
            .with(&format!("{LLDP}.2.0.3.1"), "3")
            .with(&format!("{LLDP}.2.0.4.2"), "4")
            .with(&format!("{LLDP}.7.0.3.1"), "Gi0/1")
            .with(&format!("{LLDP}.9.0.3.1"), "deviceY")
            .with(&format!("{CDP}.6.10101.1"), "deviceZ")
            .with(&format!("{CDP}.7.10101.1"), "Fa0/5");

        let scan =
            extract_neighbors(&mut agent, &NeighborTable::standard(), CorrelationPolicy::Positional)
                .await;

        assert_eq!(
            scan.records,
            [record("deviceY", "Gi0/1", Some("3")), record("deviceZ", "Fa0/5", Some("10101"))]
        );
    }

    #[tokio::test]
    async fn test_row_indexed_joins_by_row() {
        let mut agent = MockAgent::new()
            .with(&format!("{LLDP}.2.0.3.1"), "3")
            .with(&format!("{LLDP}.2.0.4.2"), "4")
            .with(&format!("{LLDP}.7.0.3.1"), "Gi0/1")
            .with(&format!("{LLDP}.7.0.4.2"), "Gi0/2")
            .with(&format!("{LLDP}.9.0.4.2"), "deviceB.lab")
            .with(&format!("{CDP}.6.5.1"), "deviceZ")
            .with(&format!("{CDP}.7.5.1"), "Fa0/5");

        let scan =
            extract_neighbors(&mut agent, &NeighborTable::standard(), CorrelationPolicy::RowIndexed)
                .await;

        assert_eq!(
            scan.records,
            [record("deviceB", "Gi0/2", Some("4")), record("deviceZ", "Fa0/5", Some("5"))]
        );
    }

    #[tokio::test]
    async fn test_failed_table_does_not_hide_the_other() {
        let timeout = SessionError::Timeout(Duration::from_secs(1));
        let mut agent = MockAgent::new()
            .failing_at("1.0.8802.1.1.2.1.4", timeout)
            .with(&format!("{CDP}.6.5.1"), "deviceZ")
            .with(&format!("{CDP}.7.5.1"), "Fa0/5");

        let scan =
            extract_neighbors(&mut agent, &NeighborTable::standard(), CorrelationPolicy::Positional)
                .await;

        assert_eq!(scan.records, [record("deviceZ", "Fa0/5", Some("5"))]);
        assert_eq!(scan.errors.len(), 1);
        assert!(!scan.is_total_failure());
    }

    #[tokio::test]
    async fn test_unresponsive_device_is_total_failure() {
        let mut agent = MockAgent::unresponsive();
        let scan =
            extract_neighbors(&mut agent, &NeighborTable::standard(), CorrelationPolicy::Positional)
                .await;
        assert!(scan.records.is_empty());
        assert!(scan.is_total_failure());
    }

    #[tokio::test]
    async fn test_binary_device_id_rendered_as_hex() {
        let mut agent = MockAgent::new()
            .with(&format!("{LLDP}.7.0.1.1"), "ge-0/0/1")
            .with_value(
                &format!("{LLDP}.9.0.1.1"),
                SnmpValue::OctetString(vec![0x00, 0x1b, 0x54, 0xaa, 0x01, 0xff]),
            );
        let scan =
            extract_neighbors(&mut agent, &[NeighborTable::lldp()], CorrelationPolicy::Positional)
                .await;
        assert_eq!(scan.records, [record("0x001b54aa01ff", "ge-0/0/1", None)]);
    }
}
