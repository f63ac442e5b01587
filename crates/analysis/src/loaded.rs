// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! A loaded database together with its pending launchers

use tracing::debug;

use schemadiff_ir::ParsedFragment;
use schemadiff_schema::{Database, StatementId};

use crate::error::AnalysisResult;
use crate::launcher::{AnalysisLauncher, LauncherKind};

/// Database plus the arena of launchers queued while loading it
///
/// Each slot holds a launcher until the full pass takes it out. An empty slot
/// means the launcher has run or is running.
#[derive(Debug)]
pub struct LoadedDatabase {
    pub database: Database,
    launchers: Vec<Option<AnalysisLauncher>>,
}

impl LoadedDatabase {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            launchers: Vec::new(),
        }
    }

    /// Queue analysis of `fragment` for statement `owner`
    ///
    /// Returns the slot index of the new launcher.
    pub fn queue(
        &mut self,
        owner: StatementId,
        kind: LauncherKind,
        fragment: Option<ParsedFragment>,
    ) -> AnalysisResult<usize> {
        let launcher = AnalysisLauncher::for_statement(&self.database, owner, kind, fragment)?;
        Ok(self.push(launcher))
    }

    pub fn push(&mut self, launcher: AnalysisLauncher) -> usize {
        debug!(
            statement = %launcher.statement_name(),
            kind = %launcher.kind(),
            slot = self.launchers.len(),
            "Queued launcher"
        );
        self.launchers.push(Some(launcher));
        self.launchers.len() - 1
    }

    /// Number of launchers that have not run yet
    pub fn pending(&self) -> usize {
        self.launchers.iter().filter(|slot| slot.is_some()).count()
    }

    /// Pending launchers in queue order
    pub fn launchers(&self) -> impl Iterator<Item = &AnalysisLauncher> {
        self.launchers.iter().flatten()
    }

    /// Drop every slot
    pub fn clear(&mut self) {
        self.launchers.clear();
    }

    pub fn into_database(self) -> Database {
        self.database
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Database, &mut Vec<Option<AnalysisLauncher>>) {
        (&mut self.database, &mut self.launchers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use schemadiff_test_utils::{IrFixtures, MockSchemaBuilder};

    #[test]
    fn test_queue_assigns_slots() {
        let schema = MockSchemaBuilder::default().with_standard_schema().build();
        let (v, v2) = (schema.id("v"), schema.id("v2"));
        let mut loaded = LoadedDatabase::new(schema.database);

        let fragment = IrFixtures::query_fragment(IrFixtures::select(
            vec![IrFixtures::col("a")],
            vec![IrFixtures::table("t")],
        ));
        assert_eq!(loaded.queue(v, LauncherKind::View, Some(fragment.clone())).unwrap(), 0);
        assert_eq!(loaded.queue(v2, LauncherKind::View, Some(fragment)).unwrap(), 1);
        assert_eq!(loaded.pending(), 2);
        assert_eq!(
            loaded.launchers().map(|l| l.owner()).collect::<Vec<_>>(),
            vec![v, v2]
        );

        let (_, slots) = loaded.parts_mut();
        let taken = slots[0].take();
        assert!(taken.is_some());
        assert_eq!(loaded.pending(), 1);

        loaded.clear();
        assert_eq!(loaded.pending(), 0);
    }

    #[test]
    fn test_queue_rejects_unknown_owner() {
        let mut loaded = LoadedDatabase::new(MockSchemaBuilder::default().build().database);
        let err = loaded
            .queue(StatementId(7), LauncherKind::Operator, None)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownStatement(_)));
        assert_eq!(loaded.pending(), 0);
    }
}
