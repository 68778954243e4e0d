use crate::common::RecordId;
use crate::error::Result;

use self::schema::TupleDesc;
use self::value::Field;

pub mod schema;
pub mod value;

/// A single row: its schema, its field values and, once it has been stored on
/// a page, the record id it was stored under.
#[derive(Clone, Debug)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: TupleDesc, fields: Vec<Field>) -> Self {
        debug_assert_eq!(desc.num_fields(), fields.len());
        Self {
            desc,
            fields,
            record_id: None,
        }
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> &Field {
        &self.fields[index]
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Replaces the descriptor, e.g. to relabel fields with a scan alias.
    /// The new descriptor must describe the same field types.
    pub fn with_desc(mut self, desc: TupleDesc) -> Self {
        debug_assert_eq!(self.desc, desc);
        self.desc = desc;
        self
    }

    pub fn as_i32(&self, index: usize) -> i32 {
        self.fields[index].as_i32()
    }

    pub fn as_str(&self, index: usize) -> &str {
        self.fields[index].as_str()
    }

    /// Writes the tuple into a buffer of at least `desc.size()` bytes.
    pub fn serialize(&self, buffer: &mut [u8]) {
        let mut offset = 0;
        for field in &self.fields {
            field.serialize(&mut buffer[offset..]);
            offset += field.field_type().size();
        }
    }

    /// Parses a tuple stored under `record_id` from its on-disk representation.
    pub fn parse(bytes: &[u8], desc: &TupleDesc, record_id: RecordId) -> Result<Self> {
        let mut offset = 0;
        let mut fields = Vec::with_capacity(desc.num_fields());
        for item in desc.items() {
            let field = Field::parse(&bytes[offset..], item.field_type())?;
            offset += item.field_type().size();
            fields.push(field);
        }
        let mut tuple = Tuple::new(desc.clone(), fields);
        tuple.set_record_id(Some(record_id));
        Ok(tuple)
    }
}

/// Tuples compare by schema and values; the record id is storage bookkeeping
/// and does not take part.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.fields == other.fields
    }
}

impl Eq for Tuple {}
