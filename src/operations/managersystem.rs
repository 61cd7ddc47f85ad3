use super::operationsystem::*;
use super::paver::*;
use super::scout::*;
use crate::world::*;
use log::*;
use specs::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Builds the operation for the name a flag gives it.
pub type OperationFactory = Arc<dyn Fn(&str) -> Result<Box<dyn Operation>, String> + Send + Sync>;

/// Flag prefixes and the operation each one creates, in registration order.
#[derive(Clone, Default)]
pub struct OperationTypes {
    types: Vec<(String, OperationFactory)>,
}

impl OperationTypes {
    pub fn new() -> OperationTypes {
        OperationTypes::default()
    }

    pub fn with_defaults() -> OperationTypes {
        let mut types = OperationTypes::new();

        types.register(SCOUT_OPERATION, |_| Ok(Box::new(ScoutOperation::new())));
        types.register(PAVER_OPERATION, |_| Ok(Box::new(PaverOperation::new())));

        types
    }

    pub fn register<F>(&mut self, prefix: &str, factory: F)
    where
        F: Fn(&str) -> Result<Box<dyn Operation>, String> + Send + Sync + 'static,
    {
        self.types.push((prefix.to_owned(), Arc::new(factory)));
    }

    fn find(&self, flag_name: &str) -> Option<(&str, &OperationFactory)> {
        self.types
            .iter()
            .find(|(prefix, _)| flag_name.starts_with(prefix.as_str()))
            .map(|(prefix, factory)| (prefix.as_str(), factory))
    }
}

/// The part of the flag name after its first `_`, or the whole name.
pub fn operation_name(flag_name: &str) -> &str {
    flag_name.split_once('_').map(|(_, name)| name).unwrap_or(flag_name)
}

/// Operations for every flag that matches a registered prefix, ordered by priority. Flags giving an
/// already used name, and operations that fail to build, are skipped.
pub fn discover_operations(flags: &[FlagSnapshot], types: &OperationTypes) -> Vec<OperationData> {
    let mut names = HashSet::new();
    let mut operations = Vec::new();

    for flag in flags {
        let (kind, factory) = match types.find(&flag.name) {
            Some(entry) => entry,
            None => continue,
        };

        let name = operation_name(&flag.name);

        if !names.insert(name.to_owned()) {
            warn!("Duplicate operation name - Flag: {} - Operation: {}", flag.name, name);

            continue;
        }

        match factory(name) {
            Ok(operation) => operations.push(OperationData::new(name, kind, flag.pos, operation)),
            Err(err) => warn!("Failed to create operation - Flag: {} - Error: {}", flag.name, err),
        }
    }

    operations.sort_by_key(|operation| operation.priority);

    operations
}

#[derive(SystemData)]
pub struct OperationManagerSystemData<'a> {
    host: WriteExpect<'a, Host>,
    types: ReadExpect<'a, OperationTypes>,
    operations: WriteExpect<'a, Operations>,
}

/// Rebuilds the operation list from the flags at the start of the tick.
pub struct OperationManagerSystem;

impl<'a> System<'a> for OperationManagerSystem {
    type SystemData = OperationManagerSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let flags = data.host.get().flags();

        let operations = discover_operations(&flags, &data.types);

        debug!("Operations discovered - Flags: {} - Operations: {}", flags.len(), operations.len());

        data.operations.replace(operations);
    }
}
