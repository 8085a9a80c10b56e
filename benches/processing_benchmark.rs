use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use i94_warehouse::models::{
    CityTemperatureRecord, ImmigrationRecord, MappingDimension, PortDimensionRow, VisitFact,
};
use i94_warehouse::processors::staging::{stage_immigration, stage_temperatures};
use i94_warehouse::processors::FactBuilder;
use i94_warehouse::readers::{MappingReader, MappingSource};
use i94_warehouse::writers::TableRecord;
use std::collections::HashSet;
use std::path::Path;

const CITIES: &[(&str, &str, &str)] = &[
    ("NYC", "new york", "new york"),
    ("BOS", "boston", "massachusetts"),
    ("AUS", "austin", "texas"),
    ("CHI", "chicago", "illinois"),
    ("SFR", "san francisco", "california"),
];

// Synthetic ports, April 2016 temperatures and visits spread over the ports
fn create_test_data(
    visit_count: usize,
) -> (Vec<PortDimensionRow>, Vec<CityTemperatureRecord>, Vec<ImmigrationRecord>) {
    let ports: Vec<PortDimensionRow> = CITIES
        .iter()
        .map(|(code, city, state)| PortDimensionRow {
            port_code: code.to_string(),
            city: city.to_string(),
            state_code: "XX".to_string(),
            state: state.to_string(),
        })
        .collect();

    let mut temperatures = Vec::new();
    for (_, city, state) in CITIES {
        for day in 1..=30 {
            temperatures.push(CityTemperatureRecord::new(
                "US",
                state,
                city,
                (2016, 4, day),
                50.0 + day as f64 * 0.5,
            ));
        }
    }

    let visits = (0..visit_count)
        .map(|i| {
            // every seventh visit goes through a port outside the dimension
            let port = if i % 7 == 0 { "ZZZ" } else { CITIES[i % CITIES.len()].0 };
            let arrival = 20545 + (i % 30) as i64;
            let mut record = ImmigrationRecord::new(i as i64)
                .with_port(port)
                .with_dates(Some(arrival), Some(arrival + (i % 14) as i64))
                .with_match_flag("M");
            record.i94cit = Some(101 + (i % 50) as i64);
            record.i94mode = Some(1);
            record.i94visa = Some(2);
            record
        })
        .collect();

    (ports, temperatures, visits)
}

fn create_port_mapping_text(lines: usize) -> String {
    let mut text = String::new();
    for i in 0..lines {
        text.push_str(&format!("\t'P{:04}'\t=\t'CITY {}, NY          '\n", i, i));
    }
    text
}

fn benchmark_mapping_parser(c: &mut Criterion) {
    let text = create_port_mapping_text(660);
    let source = MappingSource::for_dimension(MappingDimension::UsPort);
    let reader = MappingReader::new();

    c.bench_function("mapping_parser_us_port", |b| {
        b.iter(|| {
            let table = reader
                .parse_mapping_text(black_box(&text), Path::new("i94prtl.txt"), &source)
                .unwrap();
            black_box(table.len())
        })
    });
}

fn benchmark_staging(c: &mut Criterion) {
    let (_, temperatures, visits) = create_test_data(10_000);
    let valid_ports: HashSet<&str> = CITIES.iter().map(|(code, _, _)| *code).collect();

    c.bench_function("stage_immigration", |b| {
        b.iter(|| {
            let (rows, report) = stage_immigration(visits.clone(), &valid_ports);
            black_box((rows.len(), report.output_rows))
        })
    });

    c.bench_function("stage_temperatures", |b| {
        b.iter(|| {
            let (rows, _) = stage_temperatures(temperatures.clone());
            black_box(rows.len())
        })
    });
}

fn benchmark_fact_builder(c: &mut Criterion) {
    let (ports, temperatures, visits) = create_test_data(10_000);

    c.bench_function("fact_builder", |b| {
        b.iter(|| {
            let (facts, _) = FactBuilder::default()
                .build(&visits, &ports, &temperatures)
                .unwrap();
            black_box(facts.len())
        })
    });
}

fn benchmark_arrow_conversion(c: &mut Criterion) {
    let (ports, temperatures, visits) = create_test_data(10_000);
    let (facts, _) = FactBuilder::default()
        .build(&visits, &ports, &temperatures)
        .unwrap();

    c.bench_function("visit_fact_to_batch", |b| {
        b.iter(|| {
            let batch = VisitFact::to_batch(black_box(&facts)).unwrap();
            black_box(batch.num_rows())
        })
    });
}

fn benchmark_varying_data_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("fact_builder_by_size");

    for &size in &[1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::new("visits", size), &size, |b, &visit_count| {
            let (ports, temperatures, visits) = create_test_data(visit_count);
            let builder = FactBuilder::default();

            b.iter(|| {
                let (facts, report) = builder.build(&visits, &ports, &temperatures).unwrap();
                black_box((facts.len(), report.unknown_port))
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_mapping_parser,
    benchmark_staging,
    benchmark_fact_builder,
    benchmark_arrow_conversion,
    benchmark_varying_data_sizes
);
criterion_main!(benches);
