use crate::models::{
    AlertTable, CapturedImageTable, DailyStatisticsTable, DetectionTable, DeviceStatusTable,
    SystemConfigTable, SystemLogTable, Table,
};

pub struct SchemaManager {
    tables: Vec<Box<dyn Table + Send + Sync>>,
}

impl SchemaManager {
    pub fn new(mut tables: Vec<Box<dyn Table + Send + Sync>>) -> Self {
        Self::sort_tables(&mut tables);
        Self { tables }
    }

    /// Orders tables so each one follows everything it references. Tables caught
    /// in a cycle keep their given order at the end.
    fn sort_tables(tables: &mut Vec<Box<dyn Table + Send + Sync>>) {
        let mut pending = std::mem::take(tables);
        let mut placed: Vec<&'static str> = Vec::with_capacity(pending.len());

        loop {
            let ready = pending.iter().position(|table| {
                table
                    .dependencies()
                    .iter()
                    .all(|dependency| placed.contains(dependency))
            });
            let Some(next) = ready else { break };

            let table = pending.remove(next);
            placed.push(table.name());
            tables.push(table);
        }

        if !pending.is_empty() {
            let names: Vec<_> = pending.iter().map(|table| table.name()).collect();
            tracing::warn!("unresolved table dependencies: {}", names.join(", "));
            tables.append(&mut pending);
        }
    }

    pub fn create_schema(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.create()).collect()
    }

    pub fn dispose_schema(&self) -> Vec<String> {
        self.tables.iter().rev().map(|table| table.dispose()).collect()
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        SchemaManager::new(vec![
            Box::new(CapturedImageTable),
            Box::new(AlertTable),
            Box::new(DetectionTable),
            Box::new(DeviceStatusTable),
            Box::new(SystemLogTable),
            Box::new(SystemConfigTable),
            Box::new(DailyStatisticsTable),
        ])
    }
}
