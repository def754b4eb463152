//! Demonstration harness for the sortspec library
//!
//! Generates (or reads) a small person dataset and applies a query-string
//! sort specification to it, printing the ordered records. Invalid sort
//! parameters either fail the run or, with --lenient, are reported and
//! ignored.

use std::fmt;
use std::fs;
use std::process;

use clap::{Arg, ArgAction, Command};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sortspec::{
    SortContext, SortDirection, Sorter, SorterError, SorterOptions, SorterResult, EXIT_SUCCESS,
};

/// Name pool for generated records
const NAMES: &[&str] = &[
    "Alice", "Bob", "Charlie", "David", "Eve", "Frank", "Grace", "Hannah", "Ivy", "Jack",
];

#[derive(Debug, Clone)]
struct Person {
    name: String,
    age: u32,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.age)
    }
}

fn main() {
    match run() {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("sortspec: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run() -> SorterResult<i32> {
    let matches = build_cli().get_matches();

    let mut people = match matches.get_one::<String>("input") {
        Some(path) => read_people(path)?,
        None => {
            let count = *matches.get_one::<usize>("count").unwrap_or(&10);
            let seed = *matches.get_one::<u64>("seed").unwrap_or(&2024);
            generate_people(count, seed)
        }
    };

    let options = SorterOptions {
        ignore_invalid_parameters: matches.get_flag("lenient"),
        ..Default::default()
    };
    let sorter = person_sorter(options)?;

    let context = match matches.get_one::<String>("sort") {
        Some(query) => sorter.sort(&mut people, query)?,
        None => {
            sorter.sort_default(&mut people);
            SortContext::empty()
        }
    };

    if !context.is_valid() {
        eprintln!(
            "ignored invalid sort parameters: {}",
            context.invalid_parameters().iter().join(", ")
        );
    }

    for person in &people {
        println!("{}", person);
    }

    Ok(EXIT_SUCCESS)
}

fn build_cli() -> Command {
    Command::new("sortspec")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sort demo records with a query-string sort specification")
        .long_about(
            "Sort demo records with a query-string sort specification.\n\n\
             The sortable keys are 'name' and 'age'; 'age' descending is the \
             default ordering when no query is given. A leading '-' on a key \
             requests descending order, e.g. 'name,-age'.",
        )
        .arg(
            Arg::new("sort")
                .short('s')
                .long("sort")
                .help("Sort query, e.g. 'name,-age'")
                .value_name("QUERY"),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help("Read 'name,age' records from FILE instead of generating them")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .help("Number of records to generate")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .default_value("10"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for the generated records")
                .value_name("SEED")
                .value_parser(clap::value_parser!(u64))
                .default_value("2024"),
        )
        .arg(
            Arg::new("lenient")
                .long("lenient")
                .help("Report invalid sort parameters instead of failing")
                .action(ArgAction::SetTrue),
        )
}

fn person_sorter(options: SorterOptions) -> SorterResult<Sorter<Person>> {
    Sorter::with_options(options, |keys| {
        keys.key("name", |p: &Person| p.name.clone());
        keys.key("age", |p: &Person| p.age)
            .default_direction(SortDirection::Descending);
    })
}

fn generate_people(count: usize, seed: u64) -> Vec<Person> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Person {
            name: NAMES[rng.gen_range(0..NAMES.len())].to_string(),
            age: rng.gen_range(18..100),
        })
        .collect()
}

fn read_people(path: &str) -> SorterResult<Vec<Person>> {
    let contents = fs::read_to_string(path)?;

    let mut people = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        people.push(parse_person_line(line, number + 1)?);
    }

    Ok(people)
}

fn parse_person_line(line: &str, number: usize) -> SorterResult<Person> {
    let (name, age) = line.split_once(',').ok_or_else(|| {
        SorterError::invalid_record(&format!("line {}: expected 'name,age'", number))
    })?;

    let age = age.trim().parse::<u32>().map_err(|_| {
        SorterError::invalid_record(&format!("line {}: invalid age '{}'", number, age.trim()))
    })?;

    Ok(Person {
        name: name.trim().to_string(),
        age,
    })
}
