use std::{env, error::Error};

use lodecoin_core::command::dispatch_command;
use lodecoin_core::commands::make_command_map;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let command_map = make_command_map();
    let args: Vec<String> = env::args().collect();

    dispatch_command(&args[1..].to_vec(), &command_map, None);

    Ok(())
}
