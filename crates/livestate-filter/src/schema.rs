//! Column vocabulary shared between filters and the rows they run on.

use crate::bitmask::Bitmask;
use crate::error::{FilterError, Result};
use crate::value::Value;
use std::collections::HashMap;

/// Position of a column inside its [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub u16);

impl ColumnId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Contiguous range of small integer codes, `min..min + names.len()`.
///
/// Code `min + k` is represented by bit `k` of a [`Bitmask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumDomain {
    pub min: i64,
    pub names: &'static [&'static str],
}

impl EnumDomain {
    pub const fn new(min: i64, names: &'static [&'static str]) -> Self {
        Self { min, names }
    }

    pub fn len(&self) -> u32 {
        self.names.len().min(Bitmask::WIDTH as usize) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn full_mask(&self) -> Bitmask {
        Bitmask::low_bits(self.len())
    }

    pub fn bit_of(&self, code: i64) -> Option<u32> {
        let k = code.checked_sub(self.min)?;
        (0..i64::from(self.len())).contains(&k).then_some(k as u32)
    }

    pub fn code_of(&self, bit: u32) -> i64 {
        self.min + i64::from(bit)
    }

    pub fn name(&self, code: i64) -> Option<&'static str> {
        self.bit_of(code).map(|k| self.names[k as usize])
    }

    /// Accepts either a symbolic name (any case) or the numeric code.
    pub fn parse(&self, text: &str) -> Option<i64> {
        let text = text.trim();
        if let Some(k) = self.names.iter().position(|n| n.eq_ignore_ascii_case(text)) {
            return Some(self.code_of(k as u32));
        }
        text.parse().ok()
    }
}

const FLAG_DOMAIN: EnumDomain = EnumDomain::new(0, &["0", "1"]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    Time,
    Bool,
    Enum(EnumDomain),
}

impl ColumnKind {
    /// Domain of the columns whose values fit a bitmask: enums and flags.
    pub fn bit_domain(&self) -> Option<EnumDomain> {
        match self {
            ColumnKind::Enum(domain) => Some(*domain),
            ColumnKind::Bool => Some(FLAG_DOMAIN),
            _ => None,
        }
    }

    /// Bit standing for `value`, if this column is bit-representable.
    pub fn bit_of(&self, value: &Value) -> Option<u32> {
        match (self, value) {
            (ColumnKind::Bool, Value::Bool(b)) => Some(u32::from(*b)),
            (ColumnKind::Enum(domain), v) => domain.bit_of(v.as_i64()?),
            _ => None,
        }
    }

    /// Row value represented by bit `k`.
    pub fn value_of_bit(&self, k: u32) -> Option<Value> {
        match self {
            ColumnKind::Bool => Some(Value::Bool(k == 1)),
            ColumnKind::Enum(domain) => Some(Value::Int(domain.code_of(k))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub id: ColumnId,
    pub name: String,
    pub description: String,
    pub kind: ColumnKind,
}

/// Named columns of one table.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<ColumnDef>,
    by_name: HashMap<String, ColumnId>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, name: &str, description: &str, kind: ColumnKind) -> Self {
        self.add_column(name, description, kind);
        self
    }

    /// Registers a column and returns its id. Re-registering a name replaces
    /// the earlier definition under the same id.
    pub fn add_column(&mut self, name: &str, description: &str, kind: ColumnKind) -> ColumnId {
        if let Some(id) = self.by_name.get(name).copied() {
            let column = &mut self.columns[id.index()];
            column.description = description.to_string();
            column.kind = kind;
            return id;
        }
        let id = ColumnId(self.columns.len() as u16);
        self.columns.push(ColumnDef {
            id,
            name: name.to_string(),
            description: description.to_string(),
            kind,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn column(&self, name: &str) -> Result<&ColumnDef> {
        self.by_name
            .get(name)
            .map(|id| &self.columns[id.index()])
            .ok_or_else(|| FilterError::UnknownColumn(name.to_string()))
    }

    pub fn get(&self, id: ColumnId) -> Option<&ColumnDef> {
        self.columns.get(id.index())
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Columns that can be compiled into bitmask tests.
    pub fn bit_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.kind.bit_domain().is_some())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Read access to one row.
///
/// Implementations only ever see ids handed out by the schema the filter was
/// built against; any other id is a bug in the caller and may panic.
pub trait Row {
    fn get(&self, column: ColumnId) -> Value;
}
