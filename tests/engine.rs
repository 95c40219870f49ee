//! End to end tests of the transform and reduce engine, exercising the public API the way an
//! application would: build buffers, seal them into table columns, run parallel reductions and
//! applications and check the results against sequentially computed expectations.

use anyhow::Error;
use test_case::test_case;

use coltable::{
    buffers::{AnyCategoricalBuffer, FreeBuffer, RealBuffer},
    reader::{GeneralRowReader, NumericReader, NumericRowReader},
    Column, ColumnType, Context, Error as EngineError, IntegerFormat, Table, Workload,
    BEFORE_FIRST,
};

/// 75 rows of `value0` .. `value9`, repeating. The dictionary ends up with 11 entries (the
/// missing slot plus ten strings) and the index stream cycles through 1..=10.
fn cyclic_word_column(rows: usize) -> Column {
    let mut buffer = AnyCategoricalBuffer::new(rows, IntegerFormat::U16);
    for row in 0..rows {
        buffer.set(row, Some(format!("value{}", row % 10))).unwrap();
    }
    buffer.to_column(ColumnType::Categorical).unwrap()
}

fn real_column(values: &[f64]) -> Column {
    let mut buffer = RealBuffer::new(values.len());
    for (row, &value) in values.iter().enumerate() {
        buffer.set(row, value);
    }
    buffer.to_column(ColumnType::Real).unwrap()
}

/// Routes engine log output into the test harness. Run with `RUST_LOG=debug` to see the batch
/// planning decisions of the executor.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn sum_of_dictionary_indices() -> Result<(), Error> {
    init_logging();
    let column = cyclic_word_column(75);
    let context = Context::new();

    let sum = column
        .transform()
        .workload(Workload::Large)
        .reduce_categorical(0, |a, b| a + b, &context)?;

    // Seven full cycles of 1 + 2 + .. + 10 plus the first five indices of the eighth cycle.
    assert_eq!(55 * 7 + 15, sum);
    Ok(())
}

#[test_case(Workload::Small)]
#[test_case(Workload::Default)]
#[test_case(Workload::Large)]
#[test_case(Workload::Huge)]
fn index_sum_is_independent_of_the_workload_hint(workload: Workload) {
    let column = cyclic_word_column(75);
    let context = Context::new();
    let sum = column
        .transform()
        .workload(workload)
        .reduce_categorical(0, |a, b| a + b, &context)
        .unwrap();
    assert_eq!(400, sum);
}

#[test]
fn count_of_indices_above_threshold() -> Result<(), Error> {
    let column = cyclic_word_column(75);
    let context = Context::new();

    let count = column
        .transform()
        .workload(Workload::Large)
        .reduce_categorical_with_combiner(
            0,
            |count, index| if index > 2 { count + 1 } else { count },
            |left, right| left + right,
            &context,
        )?;

    // Eight of ten indices per full cycle exceed two, plus three in the trailing five rows.
    assert_eq!(8 * 7 + 3, count);
    Ok(())
}

#[test]
fn row_reduction_over_three_categorical_columns() -> Result<(), Error> {
    let table = Table::builder(75)
        .add("a", cyclic_word_column(75))?
        .add("b", cyclic_word_column(75))?
        .add("c", cyclic_word_column(75))?
        .build();
    let context = Context::new();

    let sum = table
        .transform_multi(&["a", "b", "c"])?
        .workload(Workload::Large)
        .reduce_categorical(
            || 0.0f64,
            |acc, row| {
                *acc += (row.get(0) + row.get(1) + row.get(2)) as f64;
            },
            |left, right| *left += right,
            &context,
        )?;

    assert_eq!(3.0 * 400.0, sum);
    Ok(())
}

#[test]
fn apply_numeric_to_free_formats_values() -> Result<(), Error> {
    let column = real_column(&[0.0, 0.5, 1.0]);
    let context = Context::new();

    let applied = column
        .transform()
        .apply_to_free(|value| Some(format!("x{value:.1}")), &context)?;

    let Column::Free(free) = &applied else {
        panic!("applying to free must produce a free column")
    };
    let values = free.typed::<String>()?;
    let rendered: Vec<&str> = values
        .iter()
        .map(|slot| slot.as_ref().unwrap().as_str())
        .collect();
    assert_eq!(vec!["x0.0", "x0.5", "x1.0"], rendered);
    Ok(())
}

#[test]
fn uint8_dictionary_overflows_at_256_distinct_values() {
    let mut buffer = AnyCategoricalBuffer::new(256, IntegerFormat::U8);
    for row in 0..255 {
        assert!(buffer.try_set(row, Some(format!("distinct{row}"))));
    }
    // The 256th distinct value finds no room; the dictionary keeps its 255 values plus the
    // missing slot.
    assert!(!buffer.try_set(255, Some("one too many".to_string())));
    assert_eq!(255, buffer.different_values());
}

#[test]
fn frozen_buffers_reject_writes() {
    let mut buffer = RealBuffer::new(2);
    buffer.freeze();
    buffer.freeze();
    let result = std::panic::catch_unwind(move || buffer.set(0, 1.0));
    assert!(result.is_err());
}

#[test]
fn long_buffer_display_is_truncated() {
    let mut buffer = RealBuffer::new(33);
    for row in 0..33 {
        buffer.set(row, if row == 32 { 100.0 } else { row as f64 });
    }
    let rendered = buffer.to_string();
    assert!(rendered.starts_with("Real Buffer (33)\n(0.000, 1.000, "));
    assert!(rendered.ends_with(", ..., 100.000)"));
    // The elision replaces values instead of appending to them.
    assert!(!rendered.contains("31.000"));
}

#[test]
fn single_and_multi_column_readers_agree() -> Result<(), Error> {
    let values: Vec<f64> = (0..1000).map(|row| (row as f64).sin()).collect();
    let column = real_column(&values);

    let mut single = NumericReader::new(&column)?;
    let mut multi = NumericRowReader::new(&[&column])?;
    for &expected in &values {
        multi.move_next();
        assert_eq!(expected, single.read());
        assert_eq!(expected, multi.get(0));
    }
    assert!(!single.has_remaining());
    assert!(!multi.has_remaining());
    Ok(())
}

#[test]
fn parallel_reduction_matches_sequential_fold() -> Result<(), Error> {
    init_logging();
    let values: Vec<f64> = (0..10_000).map(|row| row as f64 * 0.5).collect();
    let expected: f64 = values.iter().sum();
    let column = real_column(&values);

    // A single worker folds everything in one batch; many workers combine partial sums.
    let sequential = column
        .transform()
        .reduce(0.0, |a, b| a + b, &Context::with_parallelism(1))?;
    let parallel = column
        .transform()
        .workload(Workload::Huge)
        .reduce(0.0, |a, b| a + b, &Context::with_parallelism(8))?;

    assert_eq!(expected, sequential);
    assert_eq!(expected, parallel);
    Ok(())
}

#[test]
fn accumulator_reduction_collects_statistics() -> Result<(), Error> {
    let values: Vec<f64> = (0..500).map(|row| row as f64).collect();
    let column = real_column(&values);
    let context = Context::new();

    let (count, sum) = column.transform().reduce_to(
        || (0usize, 0.0f64),
        |acc, value| {
            acc.0 += 1;
            acc.1 += value;
        },
        |left, right| {
            left.0 += right.0;
            left.1 += right.1;
        },
        &context,
    )?;

    assert_eq!(500, count);
    assert_eq!(values.iter().sum::<f64>(), sum);
    Ok(())
}

#[test]
fn general_row_reduction_mixes_column_types() -> Result<(), Error> {
    let mut words = AnyCategoricalBuffer::new(4, IntegerFormat::U8);
    for (row, word) in ["a", "b", "a", "c"].iter().enumerate() {
        words.set(row, Some(word.to_string()))?;
    }
    let mut boxed = FreeBuffer::new(4);
    boxed.set(1, Some("present".to_string()));
    let table = Table::builder(4)
        .add("number", real_column(&[1.0, 2.0, 3.0, 4.0]))?
        .add("word", words)?
        .add("boxed", boxed)?
        .build();
    let context = Context::new();

    let (numeric_sum, index_sum, objects) = table.transform_multi(&["number", "word", "boxed"])?.reduce_general(
        || (0.0f64, 0i64, 0usize),
        |acc, row| {
            acc.0 += row.get_numeric(0);
            acc.1 += row.get_index(1) as i64;
            acc.2 += usize::from(row.get_object(2).is_some());
        },
        |left, right| {
            left.0 += right.0;
            left.1 += right.1;
            left.2 += right.2;
        },
        &context,
    )?;

    assert_eq!(10.0, numeric_sum);
    assert_eq!(1 + 2 + 1 + 3, index_sum);
    assert_eq!(1, objects);
    Ok(())
}

#[test]
fn row_application_builds_a_new_column() -> Result<(), Error> {
    let table = Table::builder(3)
        .add("left", real_column(&[1.0, 2.0, 3.0]))?
        .add("right", real_column(&[10.0, 20.0, 30.0]))?
        .build();
    let context = Context::new();

    let sums = table
        .transform_multi(&["left", "right"])?
        .apply_to_real(|row| row.get(0) + row.get(1), &context)?;

    let mut reader = NumericReader::new(&sums)?;
    assert_eq!(11.0, reader.read());
    assert_eq!(22.0, reader.read());
    assert_eq!(33.0, reader.read());
    Ok(())
}

#[test]
fn cancelled_context_stops_the_computation() {
    let column = cyclic_word_column(75);
    let context = Context::new();
    context.cancel();
    let result = column
        .transform()
        .reduce_categorical(0, |a, b| a + b, &context);
    assert!(matches!(result, Err(EngineError::Cancelled)));
}

#[test]
fn panics_in_user_code_reach_the_caller() {
    let column = real_column(&[1.0, 2.0, 3.0]);
    let context = Context::new();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = column.transform().reduce(
            0.0,
            |_, _| panic!("user reducer failed"),
            &context,
        );
    }));
    assert!(outcome.is_err());
}

#[test]
fn capability_mismatches_surface_before_execution() {
    let mut boxed = FreeBuffer::new(2);
    boxed.set(0, Some("a".to_string()));
    let column = boxed.to_column(ColumnType::Free).unwrap();
    let context = Context::new();

    // A free column has no numeric view and no dictionary.
    assert!(matches!(
        column.transform().reduce(0.0, |a, b| a + b, &context),
        Err(EngineError::MissingCapability { .. })
    ));
    assert!(matches!(
        column.transform().reduce_categorical(0, |a, b| a + b, &context),
        Err(EngineError::NotCategorical)
    ));
}

#[test]
fn zero_height_tables_reduce_to_the_identity() -> Result<(), Error> {
    let table = Table::builder(0).add("empty", RealBuffer::new(0))?.build();
    let context = Context::new();
    let sum = table.transform("empty")?.reduce(42.0, |a, b| a + b, &context)?;
    assert_eq!(42.0, sum);

    let column = table.column("empty")?;
    let reader = NumericReader::new(column)?;
    assert_eq!(0, reader.remaining());
    assert_eq!(BEFORE_FIRST, reader.position());
    Ok(())
}

#[test]
fn zero_height_reduction_ignores_cancellation() -> Result<(), Error> {
    // Zero rows mean zero batches, so there is nothing to cancel and the accumulator comes
    // straight from the supplier.
    let table = Table::builder(0).add("empty", RealBuffer::new(0))?.build();
    let context = Context::new();
    context.cancel();

    let sum = table.transform("empty")?.reduce(7.0, |a, b| a + b, &context)?;
    assert_eq!(7.0, sum);

    let count = table
        .transform("empty")?
        .reduce_to(|| 0usize, |acc, _| *acc += 1, |left, right| *left += right, &context)?;
    assert_eq!(0, count);
    Ok(())
}

#[test]
fn object_application_maps_between_element_types() -> Result<(), Error> {
    let mut words = AnyCategoricalBuffer::new(3, IntegerFormat::U8);
    words.set(0, Some("alpha".to_string()))?;
    words.set(2, Some("gamma".to_string()))?;
    let column = words.to_column(ColumnType::Categorical)?;
    let context = Context::new();

    let lengths = column.transform().apply_object_to_free(
        |word: Option<&String>| word.map(|word| word.len() as i64),
        &context,
    )?;

    let Column::Free(free) = &lengths else {
        panic!("expected free column")
    };
    let values = free.typed::<i64>()?;
    assert_eq!(5, *values[0].as_ref().unwrap().as_ref());
    assert!(values[1].is_none());
    assert_eq!(5, *values[2].as_ref().unwrap().as_ref());
    Ok(())
}

#[test]
fn general_row_reader_reports_its_shape() -> Result<(), Error> {
    let table = Table::builder(75)
        .add("a", cyclic_word_column(75))?
        .add("b", cyclic_word_column(75))?
        .build();
    let columns = [table.column("a")?, table.column("b")?];
    let mut reader = GeneralRowReader::new(&columns)?;
    assert_eq!(
        "General Row reader (75x2)\nRow position: -1",
        reader.to_string()
    );
    reader.move_next();
    reader.move_next();
    assert_eq!(
        "General Row reader (75x2)\nRow position: 1",
        reader.to_string()
    );
    Ok(())
}
