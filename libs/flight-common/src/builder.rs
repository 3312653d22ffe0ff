//! Positional row appenders over Arrow column builders.
//!
//! A [`RecordAppender`] walks the schema's fields in declaration order:
//! each `append_*` call writes into the next column. [`StructAppender`] and
//! [`ListAppender`] do the same for nested values and emit a null slot when
//! the callback appended nothing.
//!
//! The appenders do not check value types against the schema; a transformer
//! appending the wrong type for a column panics on the builder downcast.
//! Transformers own that contract and are covered by the table tests.

use arrow::array::{
    make_builder, ArrayBuilder, BinaryBuilder, BooleanBuilder, Decimal128Builder, Float64Builder,
    Int32Builder, Int64Builder, ListBuilder, StringBuilder, StructBuilder, UInt32Builder,
    UInt64Builder,
};
use arrow::datatypes::{DataType, FieldRef, Fields, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

const TYPE_MISMATCH: &str = "column builder does not match the appended value type";

/// Owns one column builder per schema field and materializes record
/// batches from whatever rows have been appended since the last finish.
pub struct RecordBuilder {
    schema: SchemaRef,
    builders: Vec<Box<dyn ArrayBuilder>>,
}

impl RecordBuilder {
    pub fn new(schema: SchemaRef) -> Self {
        let builders = schema
            .fields()
            .iter()
            .map(|field| make_builder(field.data_type(), 0))
            .collect();
        Self { schema, builders }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Starts a new row. Every column must receive exactly one value
    /// before the returned appender is built.
    pub fn appender(&mut self) -> RecordAppender<'_> {
        RecordAppender {
            schema: self.schema.clone(),
            builders: &mut self.builders,
            index: 0,
        }
    }

    /// Finishes the pending rows into a record batch and resets the
    /// builders for the next batch.
    pub fn finish(&mut self) -> Result<RecordBatch, ArrowError> {
        let columns = self.builders.iter_mut().map(|b| b.finish()).collect();
        RecordBatch::try_new(self.schema.clone(), columns)
    }
}

fn downcast<T: ArrayBuilder>(builder: &mut Box<dyn ArrayBuilder>) -> &mut T {
    builder.as_any_mut().downcast_mut::<T>().expect(TYPE_MISMATCH)
}

/// Appends one row across the top-level columns of a [`RecordBuilder`].
pub struct RecordAppender<'a> {
    schema: SchemaRef,
    builders: &'a mut [Box<dyn ArrayBuilder>],
    index: usize,
}

impl RecordAppender<'_> {
    fn advance(&mut self) -> usize {
        let i = self.index;
        self.index += 1;
        i
    }

    pub fn append_string(mut self, value: impl AsRef<str>) -> Self {
        let i = self.advance();
        downcast::<StringBuilder>(&mut self.builders[i]).append_value(value.as_ref());
        self
    }

    pub fn append_binary(mut self, value: impl AsRef<[u8]>) -> Self {
        let i = self.advance();
        downcast::<BinaryBuilder>(&mut self.builders[i]).append_value(value.as_ref());
        self
    }

    pub fn append_bool(mut self, value: bool) -> Self {
        let i = self.advance();
        downcast::<BooleanBuilder>(&mut self.builders[i]).append_value(value);
        self
    }

    pub fn append_i32(mut self, value: i32) -> Self {
        let i = self.advance();
        downcast::<Int32Builder>(&mut self.builders[i]).append_value(value);
        self
    }

    pub fn append_i64(mut self, value: i64) -> Self {
        let i = self.advance();
        downcast::<Int64Builder>(&mut self.builders[i]).append_value(value);
        self
    }

    pub fn append_u32(mut self, value: u32) -> Self {
        let i = self.advance();
        downcast::<UInt32Builder>(&mut self.builders[i]).append_value(value);
        self
    }

    pub fn append_u64(mut self, value: u64) -> Self {
        let i = self.advance();
        downcast::<UInt64Builder>(&mut self.builders[i]).append_value(value);
        self
    }

    pub fn append_f64(mut self, value: f64) -> Self {
        let i = self.advance();
        downcast::<Float64Builder>(&mut self.builders[i]).append_value(value);
        self
    }

    pub fn append_decimal128(mut self, value: i128) -> Self {
        let i = self.advance();
        downcast::<Decimal128Builder>(&mut self.builders[i]).append_value(value);
        self
    }

    pub fn append_struct(mut self, f: impl FnOnce(&mut StructAppender<'_>)) -> Self {
        let i = self.advance();
        let data_type = self.schema.field(i).data_type().clone();
        let DataType::Struct(fields) = data_type else {
            panic!("{TYPE_MISMATCH}");
        };
        let builder = downcast::<StructBuilder>(&mut self.builders[i]);
        let mut appender = StructAppender::new(builder, &fields);
        f(&mut appender);
        appender.close();
        self
    }

    pub fn append_list(mut self, f: impl FnOnce(&mut ListAppender<'_>)) -> Self {
        let i = self.advance();
        let data_type = self.schema.field(i).data_type().clone();
        let DataType::List(value_field) = data_type else {
            panic!("{TYPE_MISMATCH}");
        };
        let builder = downcast::<ListBuilder<Box<dyn ArrayBuilder>>>(&mut self.builders[i]);
        let mut appender = ListAppender::new(builder, &value_field);
        f(&mut appender);
        appender.close();
        self
    }

    /// Completes the row.
    pub fn build(self) {}
}

/// Appends the children of one struct slot, positionally.
pub struct StructAppender<'a> {
    builder: &'a mut StructBuilder,
    fields: &'a Fields,
    index: usize,
}

impl<'a> StructAppender<'a> {
    fn new(builder: &'a mut StructBuilder, fields: &'a Fields) -> Self {
        Self { builder, fields, index: 0 }
    }

    fn advance(&mut self) -> usize {
        if self.index == 0 {
            self.builder.append(true);
        }
        let i = self.index;
        self.index += 1;
        i
    }

    fn close(&mut self) {
        if self.index == 0 {
            append_null_struct(self.builder, self.fields);
        }
        self.index = 0;
    }

    pub fn append_string(&mut self, value: impl AsRef<str>) -> &mut Self {
        let i = self.advance();
        self.builder
            .field_builder::<StringBuilder>(i)
            .expect(TYPE_MISMATCH)
            .append_value(value.as_ref());
        self
    }

    pub fn append_bool(&mut self, value: bool) -> &mut Self {
        let i = self.advance();
        self.builder
            .field_builder::<BooleanBuilder>(i)
            .expect(TYPE_MISMATCH)
            .append_value(value);
        self
    }

    pub fn append_u32(&mut self, value: u32) -> &mut Self {
        let i = self.advance();
        self.builder
            .field_builder::<UInt32Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_value(value);
        self
    }

    pub fn append_u64(&mut self, value: u64) -> &mut Self {
        let i = self.advance();
        self.builder
            .field_builder::<UInt64Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_value(value);
        self
    }

    pub fn append_f64(&mut self, value: f64) -> &mut Self {
        let i = self.advance();
        self.builder
            .field_builder::<Float64Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_value(value);
        self
    }

    pub fn append_decimal128(&mut self, value: i128) -> &mut Self {
        let i = self.advance();
        self.builder
            .field_builder::<Decimal128Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_value(value);
        self
    }

    pub fn append_decimal128_null(&mut self) -> &mut Self {
        let i = self.advance();
        self.builder
            .field_builder::<Decimal128Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_null();
        self
    }

    pub fn append_struct(&mut self, f: impl FnOnce(&mut StructAppender<'_>)) -> &mut Self {
        let i = self.advance();
        let fields = self.fields;
        let DataType::Struct(child_fields) = fields[i].data_type() else {
            panic!("{TYPE_MISMATCH}");
        };
        let builder = self
            .builder
            .field_builder::<StructBuilder>(i)
            .expect(TYPE_MISMATCH);
        let mut appender = StructAppender::new(builder, child_fields);
        f(&mut appender);
        appender.close();
        self
    }

    pub fn append_list(&mut self, f: impl FnOnce(&mut ListAppender<'_>)) -> &mut Self {
        let i = self.advance();
        let fields = self.fields;
        let DataType::List(value_field) = fields[i].data_type() else {
            panic!("{TYPE_MISMATCH}");
        };
        let builder = self
            .builder
            .field_builder::<ListBuilder<Box<dyn ArrayBuilder>>>(i)
            .expect(TYPE_MISMATCH);
        let mut appender = ListAppender::new(builder, value_field);
        f(&mut appender);
        appender.close();
        self
    }
}

/// Appends the elements of one list slot.
pub struct ListAppender<'a> {
    builder: &'a mut ListBuilder<Box<dyn ArrayBuilder>>,
    value_field: &'a FieldRef,
    count: usize,
}

impl<'a> ListAppender<'a> {
    fn new(builder: &'a mut ListBuilder<Box<dyn ArrayBuilder>>, value_field: &'a FieldRef) -> Self {
        Self { builder, value_field, count: 0 }
    }

    fn advance(&mut self) -> &mut Box<dyn ArrayBuilder> {
        self.count += 1;
        self.builder.values()
    }

    fn close(&mut self) {
        if self.count == 0 {
            self.builder.append_null();
        } else {
            self.builder.append(true);
        }
        self.count = 0;
    }

    pub fn append_string(&mut self, value: impl AsRef<str>) -> &mut Self {
        downcast::<StringBuilder>(self.advance()).append_value(value.as_ref());
        self
    }

    pub fn append_bool(&mut self, value: bool) -> &mut Self {
        downcast::<BooleanBuilder>(self.advance()).append_value(value);
        self
    }

    pub fn append_u32(&mut self, value: u32) -> &mut Self {
        downcast::<UInt32Builder>(self.advance()).append_value(value);
        self
    }

    pub fn append_u64(&mut self, value: u64) -> &mut Self {
        downcast::<UInt64Builder>(self.advance()).append_value(value);
        self
    }

    pub fn append_f64(&mut self, value: f64) -> &mut Self {
        downcast::<Float64Builder>(self.advance()).append_value(value);
        self
    }

    pub fn append_decimal128(&mut self, value: i128) -> &mut Self {
        downcast::<Decimal128Builder>(self.advance()).append_value(value);
        self
    }

    pub fn append_struct(&mut self, f: impl FnOnce(&mut StructAppender<'_>)) -> &mut Self {
        let value_field = self.value_field;
        let DataType::Struct(child_fields) = value_field.data_type() else {
            panic!("{TYPE_MISMATCH}");
        };
        let builder = downcast::<StructBuilder>(self.advance());
        let mut appender = StructAppender::new(builder, child_fields);
        f(&mut appender);
        appender.close();
        self
    }

    pub fn append_list(&mut self, f: impl FnOnce(&mut ListAppender<'_>)) -> &mut Self {
        let value_field = self.value_field;
        let DataType::List(child_field) = value_field.data_type() else {
            panic!("{TYPE_MISMATCH}");
        };
        let builder = downcast::<ListBuilder<Box<dyn ArrayBuilder>>>(self.advance());
        let mut appender = ListAppender::new(builder, child_field);
        f(&mut appender);
        appender.close();
        self
    }
}

/// Appends a null struct slot, keeping every child builder in step with
/// the struct's validity buffer.
fn append_null_struct(builder: &mut StructBuilder, fields: &Fields) {
    for (i, field) in fields.iter().enumerate() {
        append_null_child(builder, i, field.data_type());
    }
    builder.append_null();
}

fn append_null_child(builder: &mut StructBuilder, i: usize, data_type: &DataType) {
    match data_type {
        DataType::Utf8 => builder
            .field_builder::<StringBuilder>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::Binary => builder
            .field_builder::<BinaryBuilder>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::Boolean => builder
            .field_builder::<BooleanBuilder>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::Int32 => builder
            .field_builder::<Int32Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::Int64 => builder
            .field_builder::<Int64Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::UInt32 => builder
            .field_builder::<UInt32Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::UInt64 => builder
            .field_builder::<UInt64Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::Float64 => builder
            .field_builder::<Float64Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::Decimal128(_, _) => builder
            .field_builder::<Decimal128Builder>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::List(_) => builder
            .field_builder::<ListBuilder<Box<dyn ArrayBuilder>>>(i)
            .expect(TYPE_MISMATCH)
            .append_null(),
        DataType::Struct(child_fields) => {
            let child = builder
                .field_builder::<StructBuilder>(i)
                .expect(TYPE_MISMATCH);
            append_null_struct(child, child_fields);
        }
        other => panic!("unsupported nested column type: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Array, ListArray, StringArray, StructArray, UInt64Array};
    use arrow::datatypes::DataType;

    use super::*;
    use crate::schema::{decimal128_type, SchemaFactory};

    fn test_schema() -> SchemaRef {
        let f = SchemaFactory::new();
        Arc::new(f.new_schema(vec![
            f.new_field("hash", DataType::Utf8, "row hash"),
            f.new_field("number", DataType::UInt64, "row number"),
            f.new_field("value", decimal128_type(), "row value"),
            f.new_field(
                "header",
                f.new_struct(vec![
                    f.new_field("hash", DataType::Utf8, "header hash"),
                    f.new_field("number", DataType::UInt64, "header number"),
                ]),
                "embedded header",
            ),
            f.new_field("topics", f.new_list(DataType::Utf8), "topic list"),
        ]))
    }

    #[test]
    fn appends_scalar_and_nested_rows() {
        let mut builder = RecordBuilder::new(test_schema());

        builder
            .appender()
            .append_string("0xabc")
            .append_u64(7)
            .append_decimal128(1_000_000_000_000_000_000_000i128)
            .append_struct(|sa| {
                sa.append_string("0xparent").append_u64(6);
            })
            .append_list(|la| {
                la.append_string("t0").append_string("t1");
            })
            .build();

        let batch = builder.finish().unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 5);

        let hashes = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(hashes.value(0), "0xabc");

        let header = batch.column(3).as_any().downcast_ref::<StructArray>().unwrap();
        assert!(header.is_valid(0));
        let header_numbers = header
            .column(1)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(header_numbers.value(0), 6);

        let topics = batch.column(4).as_any().downcast_ref::<ListArray>().unwrap();
        assert_eq!(topics.value_length(0), 2);
    }

    #[test]
    fn empty_nested_appenders_emit_null_slots() {
        let mut builder = RecordBuilder::new(test_schema());

        builder
            .appender()
            .append_string("0xdef")
            .append_u64(8)
            .append_decimal128(0)
            .append_struct(|_| {})
            .append_list(|_| {})
            .build();

        let batch = builder.finish().unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert!(batch.column(3).is_null(0));
        assert!(batch.column(4).is_null(0));
    }

    #[test]
    fn finish_resets_for_the_next_batch() {
        let mut builder = RecordBuilder::new(test_schema());
        for n in 0..3u64 {
            builder
                .appender()
                .append_string(format!("0x{n}"))
                .append_u64(n)
                .append_decimal128(n as i128)
                .append_struct(|_| {})
                .append_list(|_| {})
                .build();
        }
        assert_eq!(builder.finish().unwrap().num_rows(), 3);
        assert_eq!(builder.finish().unwrap().num_rows(), 0);
    }
}
