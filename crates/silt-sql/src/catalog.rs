//! The catalog: table, index and sequence metadata.
//!
//! Catalog objects are ordinary rows in a reserved namespace, keyed by
//! `[kind, name]`. An in-memory cache fronts the tree; DDL writes both
//! through the active transaction, and a rollback invalidates the cache
//! by reloading it from the store.

use std::collections::HashMap;

use parking_lot::RwLock;
use silt_storage::{NamespaceId, Transaction};
use tracing::debug;

use crate::error::{Error, Result};
use crate::object::{Object, Path};
use crate::tree::{Key, Range, Tree};
use crate::value::{Value, ValueKind};

/// Namespace holding the catalog itself.
pub const CATALOG_NAMESPACE: NamespaceId = NamespaceId(1);

/// First namespace handed out to user tables and indexes.
const FIRST_USER_NAMESPACE: u32 = 16;

/// Constraints on one declared column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConstraint {
    pub path: Path,
    pub kind: ValueKind,
    pub not_null: bool,
    /// Default values are evaluated once, at CREATE TABLE time.
    pub default: Option<Value>,
}

/// The primary key of a table: the paths that form the row key, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKey {
    pub paths: Vec<Path>,
}

/// Metadata of one table.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub namespace: NamespaceId,
    pub fields: Vec<FieldConstraint>,
    pub primary_key: Option<PrimaryKey>,
    /// CHECK constraints, kept as SQL text and compiled per statement.
    pub checks: Vec<String>,
    /// Hidden sequence feeding rowids for tables without a primary key.
    pub rowid_sequence: Option<String>,
}

impl TableInfo {
    /// Returns the constraint declared for `path`, if any.
    pub fn field(&self, path: &Path) -> Option<&FieldConstraint> {
        self.fields.iter().find(|f| &f.path == path)
    }

    /// Returns the primary-key paths, empty for rowid tables.
    pub fn primary_key_paths(&self) -> &[Path] {
        match &self.primary_key {
            Some(pk) => &pk.paths,
            None => &[],
        }
    }
}

/// Metadata of one index.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub name: String,
    pub table: String,
    pub paths: Vec<Path>,
    pub unique: bool,
    pub namespace: NamespaceId,
}

/// Metadata of one sequence. The current value lives in its own catalog
/// row so that it is transactional; this struct is the static part.
#[derive(Debug, Clone)]
pub struct SequenceInfo {
    pub name: String,
    pub start: i64,
    pub owner_table: Option<String>,
}

/// What a CREATE TABLE statement asks for; the catalog fills in the rest.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub fields: Vec<FieldConstraint>,
    pub primary_key: Option<PrimaryKey>,
    pub checks: Vec<String>,
}

#[derive(Debug, Default)]
struct Cache {
    tables: HashMap<String, TableInfo>,
    indexes: HashMap<String, IndexInfo>,
    sequences: HashMap<String, SequenceInfo>,
}

/// The catalog. One per database handle, shared by every transaction.
#[derive(Debug)]
pub struct Catalog {
    cache: RwLock<Cache>,
}

impl Catalog {
    /// Loads the catalog from the store.
    pub fn load(tx: &Transaction) -> Result<Self> {
        let catalog = Self {
            cache: RwLock::new(Cache::default()),
        };
        catalog.reload(tx)?;
        Ok(catalog)
    }

    /// Rebuilds the cache from the catalog namespace. Called at open and
    /// after a rollback that may have touched DDL.
    pub fn reload(&self, tx: &Transaction) -> Result<()> {
        let mut cache = Cache::default();
        let tree = Tree::new(tx, CATALOG_NAMESPACE);
        tree.iterate_on_range(&Range::default(), false, |key, row| {
            let values = key.values()?;
            let (kind, _name) = match values {
                [Value::Text(kind), Value::Text(name)] => (kind.as_str(), name),
                _ => return Ok(()),
            };
            let obj = row.object()?;
            match kind {
                "table" => {
                    let info = table_from_object(obj)?;
                    cache.tables.insert(info.name.clone(), info);
                }
                "index" => {
                    let info = index_from_object(obj)?;
                    cache.indexes.insert(info.name.clone(), info);
                }
                "sequence" => {
                    let info = sequence_from_object(obj)?;
                    cache.sequences.insert(info.name.clone(), info);
                }
                _ => {}
            }
            Ok(())
        })?;
        *self.cache.write() = cache;
        Ok(())
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Returns a table's metadata, or `NotFound`.
    pub fn table(&self, name: &str) -> Result<TableInfo> {
        self.cache.read().tables.get(name).cloned().ok_or_else(|| {
            Error::NotFound {
                kind: "table",
                name: name.to_string(),
            }
        })
    }

    /// Returns whether a table exists.
    pub fn table_exists(&self, name: &str) -> bool {
        self.cache.read().tables.contains_key(name)
    }

    /// Creates a table, allocating its namespace. Tables without a primary
    /// key get a hidden owned sequence that feeds their rowids.
    pub fn create_table(&self, tx: &Transaction, spec: TableSpec) -> Result<TableInfo> {
        if self.cache.read().tables.contains_key(&spec.name) {
            return Err(Error::AlreadyExists {
                kind: "table",
                name: spec.name,
            });
        }

        let namespace = self.allocate_namespace(tx)?;
        let rowid_sequence = if spec.primary_key.is_none() {
            let seq_name = format!("{}_seq", spec.name);
            self.create_sequence_internal(
                tx,
                SequenceInfo {
                    name: seq_name.clone(),
                    start: 1,
                    owner_table: Some(spec.name.clone()),
                },
            )?;
            Some(seq_name)
        } else {
            None
        };

        let info = TableInfo {
            name: spec.name,
            namespace,
            fields: spec.fields,
            primary_key: spec.primary_key,
            checks: spec.checks,
            rowid_sequence,
        };

        let tree = Tree::new(tx, CATALOG_NAMESPACE);
        tree.put(&object_key("table", &info.name), Some(&table_to_object(&info)))?;
        debug!(table = %info.name, namespace = info.namespace.0, "table created");

        self.cache
            .write()
            .tables
            .insert(info.name.clone(), info.clone());
        Ok(info)
    }

    /// Drops a table along with its indexes, its data, and its hidden
    /// rowid sequence.
    pub fn drop_table(&self, tx: &Transaction, name: &str) -> Result<TableInfo> {
        let info = self.table(name)?;

        for index_name in self.list_indexes(name) {
            self.drop_index(tx, &index_name)?;
        }

        Tree::new(tx, info.namespace).truncate()?;
        let tree = Tree::new(tx, CATALOG_NAMESPACE);
        tree.delete(&object_key("table", name))?;

        if let Some(seq) = &info.rowid_sequence {
            self.drop_sequence_internal(tx, seq)?;
        }

        self.cache.write().tables.remove(name);
        debug!(table = name, "table dropped");
        Ok(info)
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    /// Returns an index's metadata, or `NotFound`.
    pub fn index(&self, name: &str) -> Result<IndexInfo> {
        self.cache.read().indexes.get(name).cloned().ok_or_else(|| {
            Error::NotFound {
                kind: "index",
                name: name.to_string(),
            }
        })
    }

    /// Names of every index on `table`, sorted, so plans are reproducible.
    pub fn list_indexes(&self, table: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .cache
            .read()
            .indexes
            .values()
            .filter(|i| i.table == table)
            .map(|i| i.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Creates an index over an existing table. The caller backfills.
    pub fn create_index(
        &self,
        tx: &Transaction,
        name: String,
        table: String,
        paths: Vec<Path>,
        unique: bool,
    ) -> Result<IndexInfo> {
        if self.cache.read().indexes.contains_key(&name) {
            return Err(Error::AlreadyExists {
                kind: "index",
                name,
            });
        }
        // The owning table must exist.
        self.table(&table)?;

        let info = IndexInfo {
            name,
            table,
            paths,
            unique,
            namespace: self.allocate_namespace(tx)?,
        };

        let tree = Tree::new(tx, CATALOG_NAMESPACE);
        tree.put(&object_key("index", &info.name), Some(&index_to_object(&info)))?;
        debug!(index = %info.name, table = %info.table, "index created");

        self.cache
            .write()
            .indexes
            .insert(info.name.clone(), info.clone());
        Ok(info)
    }

    /// Drops an index and its entries.
    pub fn drop_index(&self, tx: &Transaction, name: &str) -> Result<IndexInfo> {
        let info = self.index(name)?;

        Tree::new(tx, info.namespace).truncate()?;
        Tree::new(tx, CATALOG_NAMESPACE).delete(&object_key("index", name))?;

        self.cache.write().indexes.remove(name);
        debug!(index = name, "index dropped");
        Ok(info)
    }

    // =========================================================================
    // Sequences
    // =========================================================================

    /// Returns a sequence's metadata, or `NotFound`.
    pub fn sequence(&self, name: &str) -> Result<SequenceInfo> {
        self.cache
            .read()
            .sequences
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "sequence",
                name: name.to_string(),
            })
    }

    /// Creates a user sequence.
    pub fn create_sequence(&self, tx: &Transaction, info: SequenceInfo) -> Result<()> {
        self.create_sequence_internal(tx, info)
    }

    /// Drops a sequence. Sequences owned by a table constraint refuse.
    pub fn drop_sequence(&self, tx: &Transaction, name: &str) -> Result<()> {
        let info = self.sequence(name)?;
        if let Some(owner) = &info.owner_table {
            return Err(Error::Runtime(format!(
                "cannot drop sequence {name} because constraint of table {owner} requires it"
            )));
        }
        self.drop_sequence_internal(tx, name)
    }

    /// Returns the next value of a sequence, advancing it within `tx`.
    pub fn sequence_next(&self, tx: &Transaction, name: &str) -> Result<i64> {
        let info = self.sequence(name)?;
        let tree = Tree::new(tx, CATALOG_NAMESPACE);
        let key = object_key("sequence_value", name);

        let next = match tree.get(&key) {
            Ok(row) => match row.object()?.get("current") {
                Some(Value::Integer(current)) => current + 1,
                _ => info.start,
            },
            Err(e) if e.is_key_not_found() => info.start,
            Err(e) => return Err(e),
        };

        tree.put(
            &key,
            Some(&Object::from_pairs(vec![(
                "current".to_string(),
                Value::Integer(next),
            )])),
        )?;
        Ok(next)
    }

    fn create_sequence_internal(&self, tx: &Transaction, info: SequenceInfo) -> Result<()> {
        if self.cache.read().sequences.contains_key(&info.name) {
            return Err(Error::AlreadyExists {
                kind: "sequence",
                name: info.name,
            });
        }
        let tree = Tree::new(tx, CATALOG_NAMESPACE);
        tree.put(
            &object_key("sequence", &info.name),
            Some(&sequence_to_object(&info)),
        )?;
        self.cache
            .write()
            .sequences
            .insert(info.name.clone(), info);
        Ok(())
    }

    fn drop_sequence_internal(&self, tx: &Transaction, name: &str) -> Result<()> {
        let tree = Tree::new(tx, CATALOG_NAMESPACE);
        tree.delete(&object_key("sequence", name))?;
        // The value row only exists once the sequence has been used.
        let value_key = object_key("sequence_value", name);
        if tree.exists(&value_key)? {
            tree.delete(&value_key)?;
        }
        self.cache.write().sequences.remove(name);
        Ok(())
    }

    // =========================================================================
    // Namespace allocation
    // =========================================================================

    fn allocate_namespace(&self, tx: &Transaction) -> Result<NamespaceId> {
        let tree = Tree::new(tx, CATALOG_NAMESPACE);
        let key = object_key("meta", "next_namespace");

        let next = match tree.get(&key) {
            Ok(row) => match row.object()?.get("value") {
                Some(Value::Integer(v)) => *v as u32,
                _ => FIRST_USER_NAMESPACE,
            },
            Err(e) if e.is_key_not_found() => FIRST_USER_NAMESPACE,
            Err(e) => return Err(e),
        };

        tree.put(
            &key,
            Some(&Object::from_pairs(vec![(
                "value".to_string(),
                Value::Integer((next + 1) as i64),
            )])),
        )?;
        Ok(NamespaceId(next))
    }
}

fn object_key(kind: &str, name: &str) -> Key {
    Key::from_values(vec![
        Value::Text(kind.to_string()),
        Value::Text(name.to_string()),
    ])
}

// =============================================================================
// Catalog object (de)serialization
// =============================================================================

fn kind_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Any => "any",
        ValueKind::Null => "null",
        ValueKind::Boolean => "boolean",
        ValueKind::Integer => "integer",
        ValueKind::Double => "double",
        ValueKind::Timestamp => "timestamp",
        ValueKind::Text => "text",
        ValueKind::Blob => "blob",
        ValueKind::Array => "array",
        ValueKind::Object => "object",
    }
}

fn kind_from_name(name: &str) -> Result<ValueKind> {
    Ok(match name {
        "any" => ValueKind::Any,
        "null" => ValueKind::Null,
        "boolean" => ValueKind::Boolean,
        "integer" => ValueKind::Integer,
        "double" => ValueKind::Double,
        "timestamp" => ValueKind::Timestamp,
        "text" => ValueKind::Text,
        "blob" => ValueKind::Blob,
        "array" => ValueKind::Array,
        "object" => ValueKind::Object,
        other => {
            return Err(Error::Type(format!("unknown type name {other:?} in catalog")))
        }
    })
}

fn table_to_object(info: &TableInfo) -> Object {
    let fields = info
        .fields
        .iter()
        .map(|f| {
            let mut o = Object::new();
            o.set("path", Value::Text(f.path.to_string()));
            o.set("kind", Value::Text(kind_name(f.kind).to_string()));
            o.set("not_null", Value::Boolean(f.not_null));
            if let Some(default) = &f.default {
                o.set("default", default.clone());
            }
            Value::Object(o)
        })
        .collect();

    let mut obj = Object::new();
    obj.set("name", Value::Text(info.name.clone()));
    obj.set("namespace", Value::Integer(info.namespace.0 as i64));
    obj.set("fields", Value::Array(fields));
    if let Some(pk) = &info.primary_key {
        obj.set(
            "primary_key",
            Value::Array(
                pk.paths
                    .iter()
                    .map(|p| Value::Text(p.to_string()))
                    .collect(),
            ),
        );
    }
    if !info.checks.is_empty() {
        obj.set(
            "checks",
            Value::Array(info.checks.iter().cloned().map(Value::Text).collect()),
        );
    }
    if let Some(seq) = &info.rowid_sequence {
        obj.set("rowid_sequence", Value::Text(seq.clone()));
    }
    obj
}

fn table_from_object(obj: &Object) -> Result<TableInfo> {
    let name = text_field(obj, "name")?;
    let namespace = int_field(obj, "namespace")? as u32;

    let mut fields = Vec::new();
    if let Some(Value::Array(entries)) = obj.get("fields") {
        for entry in entries {
            let entry = match entry {
                Value::Object(o) => o,
                _ => return Err(Error::Type("malformed catalog field entry".into())),
            };
            fields.push(FieldConstraint {
                path: text_field(entry, "path")?.parse()?,
                kind: kind_from_name(&text_field(entry, "kind")?)?,
                not_null: matches!(entry.get("not_null"), Some(Value::Boolean(true))),
                default: entry.get("default").cloned(),
            });
        }
    }

    let primary_key = match obj.get("primary_key") {
        Some(Value::Array(paths)) => Some(PrimaryKey {
            paths: paths
                .iter()
                .map(|p| match p {
                    Value::Text(s) => s.parse(),
                    _ => Err(Error::Type("malformed primary key path".into())),
                })
                .collect::<Result<Vec<_>>>()?,
        }),
        _ => None,
    };

    let checks = match obj.get("checks") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|v| match v {
                Value::Text(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let rowid_sequence = match obj.get("rowid_sequence") {
        Some(Value::Text(s)) => Some(s.clone()),
        _ => None,
    };

    Ok(TableInfo {
        name,
        namespace: NamespaceId(namespace),
        fields,
        primary_key,
        checks,
        rowid_sequence,
    })
}

fn index_to_object(info: &IndexInfo) -> Object {
    let mut obj = Object::new();
    obj.set("name", Value::Text(info.name.clone()));
    obj.set("table", Value::Text(info.table.clone()));
    obj.set(
        "paths",
        Value::Array(
            info.paths
                .iter()
                .map(|p| Value::Text(p.to_string()))
                .collect(),
        ),
    );
    obj.set("unique", Value::Boolean(info.unique));
    obj.set("namespace", Value::Integer(info.namespace.0 as i64));
    obj
}

fn index_from_object(obj: &Object) -> Result<IndexInfo> {
    let paths = match obj.get("paths") {
        Some(Value::Array(paths)) => paths
            .iter()
            .map(|p| match p {
                Value::Text(s) => s.parse(),
                _ => Err(Error::Type("malformed index path".into())),
            })
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(Error::Type("malformed catalog index entry".into())),
    };
    Ok(IndexInfo {
        name: text_field(obj, "name")?,
        table: text_field(obj, "table")?,
        paths,
        unique: matches!(obj.get("unique"), Some(Value::Boolean(true))),
        namespace: NamespaceId(int_field(obj, "namespace")? as u32),
    })
}

fn sequence_to_object(info: &SequenceInfo) -> Object {
    let mut obj = Object::new();
    obj.set("name", Value::Text(info.name.clone()));
    obj.set("start", Value::Integer(info.start));
    if let Some(owner) = &info.owner_table {
        obj.set("owner_table", Value::Text(owner.clone()));
    }
    obj
}

fn sequence_from_object(obj: &Object) -> Result<SequenceInfo> {
    Ok(SequenceInfo {
        name: text_field(obj, "name")?,
        start: int_field(obj, "start")?,
        owner_table: match obj.get("owner_table") {
            Some(Value::Text(s)) => Some(s.clone()),
            _ => None,
        },
    })
}

fn text_field(obj: &Object, field: &str) -> Result<String> {
    match obj.get_by_field(field)? {
        Value::Text(s) => Ok(s.clone()),
        _ => Err(Error::Type(format!("catalog field {field} is not text"))),
    }
}

fn int_field(obj: &Object, field: &str) -> Result<i64> {
    match obj.get_by_field(field)? {
        Value::Integer(i) => Ok(*i),
        _ => Err(Error::Type(format!("catalog field {field} is not an integer"))),
    }
}
