use std::collections::HashMap;
use std::error::Error;

pub struct Command<T> {
    pub processor: CommandProcessor<T>,
    pub expected_fields: Vec<Field>,
    pub desc: String,
}

/// The function that actually executes the command. Receives the decomposed
/// arguments and an optional state/context object.
pub type CommandProcessor<T> =
    fn(invocation: &CommandInvocation, state: Option<T>) -> Result<(), Box<dyn Error>>;

pub type CommandMap<T> = HashMap<String, Command<T>>;

pub struct CommandInvocation {
    /// The name of the command that was invoked
    pub name: String,

    /// Boolean flags passed with '--flag' syntax
    pub flags: Vec<String>,

    /// Ordered args with '--' args removed
    pub args: Vec<String>,

    /// Args passed with '--field=value' syntax
    pub vars: HashMap<String, String>,

    /// Resolved values for the command's expected fields
    pub fields: HashMap<String, String>,
}

impl CommandInvocation {
    pub fn get_flag(&self, flag: &str) -> bool {
        self.flags.contains(&flag.to_owned())
    }

    pub fn get_field(&self, field_name: &str) -> Option<String> {
        self.fields.get(field_name).cloned()
    }
}

pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub desc: String,
}

#[derive(PartialEq, Clone, Copy)]
pub enum FieldType {
    /// Must be passed as a named variable with --name=value syntax
    Var,

    /// Expected at the given position in the args vector unless passed
    /// as a var
    Pos(usize),
}

impl Field {
    pub fn new(name: &str, field_type: FieldType, desc: &str) -> Self {
        Field {
            name: name.to_owned(),
            field_type,
            desc: desc.to_owned(),
        }
    }
}

pub fn dispatch_command<T>(args: &Vec<String>, map: &CommandMap<T>, state: Option<T>) {
    if args.is_empty() {
        println!("Missing command");
        return;
    }

    let cmd_name = &args[0];

    if cmd_name == "help" {
        if args.len() < 2 {
            help(map);
        } else {
            help_cmd(map, &args[1]);
        }

        return;
    }

    let command = match map.get(cmd_name) {
        Some(obj) => obj,
        None => {
            println!("Unrecognized command: {cmd_name}");
            return;
        }
    };

    let invocation = match decompose_raw_args(args, &command.expected_fields) {
        Ok(invocation) => invocation,
        Err(err) => {
            println!("{err}");
            return;
        }
    };

    if let Err(err) = (command.processor)(&invocation, state) {
        println!("Error executing command: {err}");
    }
}

fn decompose_raw_args(
    raw_args: &[String],
    expected_fields: &[Field],
) -> Result<CommandInvocation, Box<dyn Error>> {
    let cmd_name = &raw_args[0];
    let trimmed_args = &raw_args[1..];

    let (specials, ordered_args): (Vec<String>, Vec<String>) = trimmed_args
        .iter()
        .map(|s| s.to_owned())
        .partition(|s| s.starts_with("--"));

    let (assignment_strs, flags): (Vec<String>, Vec<String>) = specials
        .iter()
        .map(|s| s.trim_start_matches("--").to_owned())
        .partition(|s| s.contains('='));

    let mut assignments: HashMap<String, String> = HashMap::new();
    for assignment in assignment_strs {
        let pair: Vec<&str> = assignment.splitn(2, '=').collect();
        assignments.insert(pair[0].to_owned(), pair[1].to_owned());
    }

    // Fields assigned with `--name=value` come first; the rest are picked
    // out of the positional args in declaration order
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut next_pos = 0;

    for Field {
        name, field_type, ..
    } in expected_fields
    {
        let var_field = assignments.get(name).cloned();

        match (field_type, var_field) {
            (_, Some(var)) => {
                fields.insert(name.to_owned(), var);
            }
            (FieldType::Var, None) => {
                return Err(format!(
                    "Missing expected argument {name}. Pass this in with --{name}=<value>"
                ))?
            }
            (FieldType::Pos(_), None) if next_pos < ordered_args.len() => {
                fields.insert(name.to_owned(), ordered_args[next_pos].clone());
                next_pos += 1;
            }
            (FieldType::Pos(_), None) => {
                return Err(format!(
                    "Not enough arguments: missing expected argument {name}"
                ))?
            }
        };
    }

    Ok(CommandInvocation {
        name: cmd_name.to_owned(),
        flags,
        args: ordered_args,
        vars: assignments,
        fields,
    })
}

fn help<T>(map: &CommandMap<T>) {
    println!("These are the supported commands. Do 'help command_name' to learn more about a specific command.\n");
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    for cmd_name in keys {
        let cmd = map.get(cmd_name).unwrap();
        println!("\t{}\n\t\t{}", cmd_name, cmd.desc);
    }
}

fn help_cmd<T>(map: &CommandMap<T>, cmd_name: &str) {
    let command = match map.get(cmd_name) {
        Some(obj) => obj,
        None => {
            println!("Unrecognized command: {cmd_name}");
            return;
        }
    };

    println!("{}\n", command.desc);
    println!("Syntax: \t{}", make_syntax_string(cmd_name, command));

    if !command.expected_fields.is_empty() {
        println!("\nArguments:\n");

        for field in &command.expected_fields {
            println!("\t{}\n\t\t{}", field.name, field.desc);
        }
    }
}

fn make_syntax_string<T>(name: &str, command: &Command<T>) -> String {
    let mut out = String::from(name);

    for field in &command.expected_fields {
        match field.field_type {
            FieldType::Pos(_) => {
                out.push_str(" <");
                out.push_str(&field.name);
                out.push('>');
            }
            FieldType::Var => {
                out.push_str(" --");
                out.push_str(&field.name);
                out.push_str("=<value>");
            }
        }
    }

    out
}
