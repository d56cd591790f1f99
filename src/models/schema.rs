//! Record type descriptions.
//!
//! A record type implements [`Model`] to tell the repository which table it lives
//! in, which columns it has and which associations to load with it. Values move
//! between rows and the Rust type through `serde`, so the struct's serialized
//! field names must match its column names.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Logical column type, rendered per dialect by the migrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    Boolean,
    /// Double precision float
    Double,
    Text,
    /// Bounded string
    Varchar(u32),
    Binary,
    Json,
    /// UTC timestamp, mapped to `chrono::DateTime<Utc>`
    Timestamp,
}

/// A single column declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub nullable: bool,
    pub unique: bool,
}

impl ColumnDef {
    /// A nullable, non-key column.
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            primary_key: false,
            auto_increment: false,
            nullable: true,
            unique: false,
        }
    }

    /// An auto-increment integer primary key.
    pub const fn id(name: &'static str) -> Self {
        Self {
            name,
            column_type: ColumnType::BigInt,
            primary_key: true,
            auto_increment: true,
            nullable: false,
            unique: false,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// How an association relates the two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Related rows carry `foreign_key` pointing at this row's `references`
    HasMany,
    /// Like `HasMany`, loads a single row
    HasOne,
    /// This row carries `foreign_key` pointing at the related row's `references`
    BelongsTo,
}

/// A declared association, loaded eagerly on every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Serialized field on the owning struct that receives the related value(s)
    pub field: &'static str,
    pub kind: RelationKind,
    /// Table of the related model
    pub table: &'static str,
    pub foreign_key: &'static str,
    /// Referenced column; `None` means the primary key of the referenced side
    pub references: Option<&'static str>,
    related_primary_key: &'static str,
    related_columns: fn() -> Vec<ColumnDef>,
}

impl Relation {
    /// `R` rows whose `foreign_key` equals this row's primary key.
    pub fn has_many<R: Model>(field: &'static str, foreign_key: &'static str) -> Self {
        Self::build::<R>(field, RelationKind::HasMany, foreign_key)
    }

    /// The single `R` row whose `foreign_key` equals this row's primary key.
    pub fn has_one<R: Model>(field: &'static str, foreign_key: &'static str) -> Self {
        Self::build::<R>(field, RelationKind::HasOne, foreign_key)
    }

    /// The `R` row whose primary key equals this row's `foreign_key`.
    pub fn belongs_to<R: Model>(field: &'static str, foreign_key: &'static str) -> Self {
        Self::build::<R>(field, RelationKind::BelongsTo, foreign_key)
    }

    /// Reference a column other than the primary key.
    pub fn references(mut self, column: &'static str) -> Self {
        self.references = Some(column);
        self
    }

    fn build<R: Model>(field: &'static str, kind: RelationKind, foreign_key: &'static str) -> Self {
        Self {
            field,
            kind,
            table: R::TABLE,
            foreign_key,
            references: None,
            related_primary_key: R::PRIMARY_KEY,
            related_columns: R::columns,
        }
    }

    /// Column on the owning row holding the join key.
    pub fn owner_key(&self, owner_primary_key: &'static str) -> &'static str {
        match self.kind {
            RelationKind::HasMany | RelationKind::HasOne => {
                self.references.unwrap_or(owner_primary_key)
            }
            RelationKind::BelongsTo => self.foreign_key,
        }
    }

    /// Column on the related rows holding the join key.
    pub fn related_key(&self) -> &'static str {
        match self.kind {
            RelationKind::HasMany | RelationKind::HasOne => self.foreign_key,
            RelationKind::BelongsTo => self.references.unwrap_or(self.related_primary_key),
        }
    }

    /// Primary key of the related model.
    pub fn related_primary_key(&self) -> &'static str {
        self.related_primary_key
    }

    /// Column declarations of the related model.
    pub fn related_columns(&self) -> Vec<ColumnDef> {
        (self.related_columns)()
    }
}

/// A record type the repository can store.
///
/// Fields that hold associations must be `#[serde(default)]` so rows decode
/// before (or without) their associations being attached. Association fields
/// are never written by `create` or `update`.
///
/// ```ignore
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct Post {
///     id: i64,
///     title: String,
///     #[serde(default)]
///     comments: Vec<Comment>,
/// }
///
/// impl Model for Post {
///     const TABLE: &'static str = "posts";
///
///     fn columns() -> Vec<ColumnDef> {
///         vec![
///             ColumnDef::id("id"),
///             ColumnDef::new("title", ColumnType::Varchar(100)).not_null(),
///         ]
///     }
///
///     fn relations() -> Vec<Relation> {
///         vec![Relation::has_many::<Comment>("comments", "post_id")]
///     }
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";

    fn columns() -> Vec<ColumnDef>;

    fn relations() -> Vec<Relation> {
        Vec::new()
    }

    /// Short type name used in error messages.
    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}
