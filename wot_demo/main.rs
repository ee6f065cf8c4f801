use clap::Parser;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use wot::{
    common::options::{
        DEFAULT_MAX_PROXIES, DEFAULT_MAX_THINGS, DEFAULT_POOL_CAPACITY, DEFAULT_STALE_CAPACITY,
        DEFAULT_SYMBOL_CAPACITY,
    },
    Options, OptionsBuilder, RecordField, RecordId, Runtime, RuntimeResult, ThingId, Value,
    ValueRef,
};

/// Raw command line arguments.
#[derive(Parser)]
#[command(about = "Builds the agent, door and light demo things and churns their properties")]
pub struct Args {
    /// Number of slots in the node pool
    #[arg(long, default_value_t = DEFAULT_POOL_CAPACITY)]
    pub pool_capacity: usize,

    /// Overwritten composites that can await a collection at once
    #[arg(long, default_value_t = DEFAULT_STALE_CAPACITY)]
    pub stale_capacity: usize,

    /// Maximum number of registered things
    #[arg(long, default_value_t = DEFAULT_MAX_THINGS)]
    pub max_things: usize,

    /// Maximum number of registered proxies
    #[arg(long, default_value_t = DEFAULT_MAX_PROXIES)]
    pub max_proxies: usize,

    /// Size of the symbol table
    #[arg(long, default_value_t = DEFAULT_SYMBOL_CAPACITY)]
    pub symbol_capacity: usize,

    /// Number of random updates to apply
    #[arg(short, long, default_value_t = 1000)]
    pub rounds: usize,

    /// Seed for the update sequence
    #[arg(long, default_value_t = 12)]
    pub seed: u64,

    /// Print the properties of every thing after the run
    #[arg(long, default_value_t = false)]
    pub dump: bool,
}

fn options_from_args(args: &Args) -> Options {
    OptionsBuilder::new()
        .pool_capacity(args.pool_capacity)
        .stale_capacity(args.stale_capacity)
        .max_things(args.max_things)
        .max_proxies(args.max_proxies)
        .symbol_capacity(args.symbol_capacity)
        .build()
}

pub fn print_error_message_and_exit(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn is_true(rt: &Runtime, value: Option<ValueRef>) -> bool {
    value
        .and_then(|value| rt.value(value))
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

fn unlock(
    rt: &mut Runtime,
    door: RecordId,
    _args: &[ValueRef],
) -> RuntimeResult<Option<ValueRef>> {
    let open = rt.new_bool(true)?;
    rt.set_property(door, "is_open", open)?;
    Ok(None)
}

fn toggle(
    rt: &mut Runtime,
    light: RecordId,
    _args: &[ValueRef],
) -> RuntimeResult<Option<ValueRef>> {
    let on = is_true(rt, rt.get_property(light, "on"));
    let value = rt.new_bool(!on)?;
    rt.set_property(light, "on", value)?;
    Ok(Some(value))
}

/// A valid key opens the door
fn on_key(rt: &mut Runtime, door: RecordId, key: ValueRef) {
    if is_true(rt, rt.get(key, "valid")) {
        if let Err(err) = rt.invoke(door, "unlock", &[]) {
            warn!("cannot unlock {:?}: {}", door, err);
        }
    }
}

fn on_bell(rt: &mut Runtime, door: RecordId, _data: ValueRef) {
    info!(
        "bell rang at {:?}, door open: {}",
        door,
        is_true(rt, rt.get_property(door, "is_open"))
    );
}

struct Demo {
    agent: ThingId,
    door: ThingId,
    light: ThingId,
}

fn build(rt: &mut Runtime) -> RuntimeResult<Demo> {
    let agent = rt.thing("agent12")?;
    let door = rt.thing("door12")?;
    let light = rt.thing("light12")?;

    let closed = rt.new_bool(false)?;
    rt.set_property(door, "is_open", closed)?;
    rt.register_action(door, "unlock", unlock)?;
    rt.observe(door, "key", on_key)?;
    rt.observe(door, "bell", on_bell)?;

    let off = rt.new_bool(false)?;
    rt.set_property(light, "on", off)?;
    rt.register_action(light, "toggle", toggle)?;

    let door_ref = rt.reference(door)?;
    rt.set_property(agent, "door", door_ref)?;
    let light_ref = rt.reference(light)?;
    rt.set_property(agent, "light", light_ref)?;

    Ok(Demo { agent, door, light })
}

fn churn(rt: &mut Runtime, demo: &Demo, rng: &mut StdRng) -> RuntimeResult<()> {
    match rng.random_range(0..5) {
        0 => {
            rt.invoke(demo.light, "toggle", &[])?;
        }
        1 => {
            // The key is attached to the door's events before the next allocation
            let key = rt.new_object()?;
            let scope = rt.enter_scope();
            let pinned = rt.pin(key).and_then(|()| {
                let valid = rt.new_bool(rng.random_bool(0.5))?;
                rt.insert(key, "valid", valid)
            });
            rt.exit_scope(scope);
            pinned?;
            rt.emit(demo.door, "key", key)?;
        }
        2 => {
            let nothing = rt.new_null()?;
            rt.emit(demo.door, "bell", nothing)?;
        }
        3 => {
            let closed = rt.new_bool(false)?;
            rt.set_property(demo.door, "is_open", closed)?;
        }
        _ => {
            let colour = rt.new_object()?;
            rt.set_property(demo.light, "colour", colour)?;
            for channel in ["red", "green", "blue"] {
                let level = rt.new_unsigned(rng.random_range(0..256))?;
                rt.insert(colour, channel, level)?;
            }
        }
    }

    Ok(())
}

fn run(args: &Args) -> RuntimeResult<()> {
    #[allow(unused_mut)]
    let mut rt = Runtime::new(options_from_args(args));

    #[cfg(feature = "gc_stress_test")]
    rt.enable_gc_stress_test();

    let demo = build(&mut rt)?;
    info!("started with {} slots in use", rt.heap().pool().allocated());

    let mut rng = StdRng::seed_from_u64(args.seed);
    for _ in 0..args.rounds {
        churn(&mut rt, &demo, &mut rng)?;
    }

    let stats = rt.stats();
    println!(
        "{} collections ({} full), {} slots collected, {} leaves freed eagerly",
        stats.collections, stats.full_collections, stats.slots_collected, stats.eager_frees
    );
    println!(
        "Pool is using {:.0}% of available nodes",
        rt.heap().pool().used_fraction() * 100.0
    );
    println!("Names are using {:.0}% of available symbols", rt.names().used());

    if args.dump {
        for (name, thing) in [("agent", demo.agent), ("door", demo.door), ("light", demo.light)] {
            let properties = rt.record_object(thing, RecordField::Properties)?;
            println!("{}: {}", name, rt.stringify(properties));
        }
    }

    let door_open = rt
        .get_property(demo.door, "is_open")
        .and_then(|value| rt.value(value));
    if let Some(Value::Boolean(open)) = door_open {
        info!("door finished {}", if open { "open" } else { "closed" });
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(&args) {
        print_error_message_and_exit(&err.to_string());
    }
}
