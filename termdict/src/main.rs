use clap::{Parser as ClapParser, Subcommand};
use std::process;

use termdict::{
    Enumerator, Handle, Heap, HeapSettings, MapError, ReadTermError, Value, create, get, is_map,
    put, put_entry, read_term,
};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Slots available before the first reclamation
    #[arg(long, default_value_t = HeapSettings::default().initial_slots)]
    heap_slots: usize,

    /// Upper bound on the heap size in slots
    #[arg(long, default_value_t = HeapSettings::default().max_slots)]
    max_slots: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a map from a list of entries or an existing map
    Create {
        data: String,
        #[arg(long, help = "Class to give the new map")]
        class: Option<String>,
    },
    /// Put every entry of <data> into <map>
    Put { map: String, data: String },
    /// Put a single entry into <map>
    PutEntry {
        map: String,
        key: String,
        value: String,
    },
    /// Look up <key>, or list every entry when no key is given
    Get { map: String, key: Option<String> },
    /// Check whether <term> is a map
    IsMap { term: String },
}

#[derive(Debug)]
enum CliError {
    Read(ReadTermError),
    Map(MapError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Read(err) => err.fmt(f),
            CliError::Map(err) => err.fmt(f),
        }
    }
}

impl From<ReadTermError> for CliError {
    fn from(err: ReadTermError) -> Self {
        CliError::Read(err)
    }
}

impl From<MapError> for CliError {
    fn from(err: MapError) -> Self {
        CliError::Map(err)
    }
}

fn read(heap: &mut Heap, source: &str) -> Result<Handle, CliError> {
    Ok(read_term(heap, source)?)
}

fn show(heap: &Heap, handle: Handle) -> String {
    heap.render(heap.get(handle))
}

/// Runs `command`, returning the lines to print and whether it succeeded.
fn run(heap: &mut Heap, command: &Command) -> Result<(Vec<String>, bool), CliError> {
    match command {
        Command::Create { data, class } => {
            let data = read(heap, data)?;
            let class = class.as_deref().map(|c| read(heap, c)).transpose()?;
            let map = create(heap, data, class)?;
            Ok((vec![show(heap, map)], true))
        }
        Command::Put { map, data } => {
            let map = read(heap, map)?;
            let data = read(heap, data)?;
            let result = put(heap, map, data)?;
            Ok((vec![show(heap, result)], true))
        }
        Command::PutEntry { map, key, value } => {
            let map = read(heap, map)?;
            let key = read(heap, key)?;
            let value = read(heap, value)?;
            let key = heap.get(key);
            let result = put_entry(heap, map, key, value)?;
            Ok((vec![show(heap, result)], true))
        }
        Command::Get { map, key: Some(key) } => {
            let map = read(heap, map)?;
            let key = read(heap, key)?;
            match get(heap, map, heap.get(key))? {
                Some(value) => Ok((vec![heap.render(value)], true)),
                None => Ok((Vec::new(), false)),
            }
        }
        Command::Get { map, key: None } => {
            let map = read(heap, map)?;
            let mut entries = Enumerator::new(heap, map, Value::UNBOUND)?;
            let lines = entries
                .iter(heap)
                .map(|(key, value)| format!("{}: {}", heap.render(key), heap.render(value)))
                .collect();
            Ok((lines, true))
        }
        Command::IsMap { term } => {
            let term = read(heap, term)?;
            let answer = is_map(heap, term);
            Ok((vec![answer.to_string()], answer))
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let settings = HeapSettings {
        initial_slots: cli.heap_slots,
        max_slots: cli.max_slots,
    };
    if let Err(err) = settings.validate() {
        eprintln!("Invalid heap settings: {}", err);
        process::exit(2);
    }

    let mut heap = Heap::new(settings);
    match run(&mut heap, &cli.command) {
        Ok((lines, succeeded)) => {
            for line in lines {
                println!("{}", line);
            }
            if !succeeded {
                process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(1);
        }
    }
    log::debug!("{:?}", heap);
}
