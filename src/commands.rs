use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

use crate::command::{Command, CommandInvocation, CommandMap, Field, FieldType};
use crate::v1::chain::Blockchain;
use crate::wallet::{Account, Hash256};

fn parse_hash(raw: &str) -> Result<Hash256, Box<dyn Error>> {
    let bytes = hex::decode(raw)?;

    if bytes.len() != 32 {
        return Err(format!("Expected a 32-byte hex hash, got {} bytes", bytes.len()))?;
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);

    Ok(out)
}

fn open_chain(invocation: &CommandInvocation) -> Result<(Blockchain, Account), Box<dyn Error>> {
    let db = invocation.get_field("db").unwrap();
    let miner_path = invocation.get_field("miner").unwrap();

    let miner = Account::load(Path::new(&miner_path))?;
    let chain = Blockchain::open(Path::new(&db), &miner)?;

    Ok((chain, miner))
}

fn create_account(invocation: &CommandInvocation, _state: Option<()>) -> Result<(), Box<dyn Error>> {
    let path = invocation.get_field("path").unwrap();

    let account = Account::create()?;
    account.save(Path::new(&path))?;

    println!("Created account {}", hex::encode(account.id));

    Ok(())
}

fn account_id(invocation: &CommandInvocation, _state: Option<()>) -> Result<(), Box<dyn Error>> {
    let path = invocation.get_field("path").unwrap();
    let account = Account::load(Path::new(&path))?;

    println!("{}", hex::encode(account.id));

    Ok(())
}

fn balance(invocation: &CommandInvocation, _state: Option<()>) -> Result<(), Box<dyn Error>> {
    let (chain, miner) = open_chain(invocation)?;

    // Defaults to the miner's own balance
    let account = match invocation.vars.get("account") {
        Some(raw) => parse_hash(raw)?,
        None => miner.id,
    };

    println!(
        "{} has {}",
        hex::encode(account),
        chain.balance(&account)?
    );
    chain.close();

    Ok(())
}

fn send(invocation: &CommandInvocation, _state: Option<()>) -> Result<(), Box<dyn Error>> {
    let from_path = invocation.get_field("from").unwrap();
    let to = parse_hash(&invocation.get_field("to").unwrap())?;
    let value: u64 = invocation.get_field("value").unwrap().parse()?;

    let (mut chain, _) = open_chain(invocation)?;
    let from = Account::load(Path::new(&from_path))?;

    // The mempool only lives as long as this process, so the payment is
    // queued and mined in one go
    chain.send(&from, &to, value)?;
    let block = chain.mine_next()?;

    println!(
        "Sent {} to {} in block {}",
        value,
        hex::encode(to),
        hex::encode(block.pow.hash)
    );
    chain.close();

    Ok(())
}

fn mine(invocation: &CommandInvocation, _state: Option<()>) -> Result<(), Box<dyn Error>> {
    let (mut chain, _) = open_chain(invocation)?;

    let block = chain.mine_next()?;

    println!(
        "Mined block {} (nonce {})",
        hex::encode(block.pow.hash),
        block.pow.nonce
    );
    chain.close();

    Ok(())
}

fn add_key(invocation: &CommandInvocation, _state: Option<()>) -> Result<(), Box<dyn Error>> {
    let account_path = invocation.get_field("account").unwrap();
    let account = Account::load(Path::new(&account_path))?;

    let (chain, _) = open_chain(invocation)?;
    let id = chain.add_key(&account.public_key)?;

    println!("Registered {}", hex::encode(id));
    chain.close();

    Ok(())
}

fn show_block(invocation: &CommandInvocation, _state: Option<()>) -> Result<(), Box<dyn Error>> {
    let hash = parse_hash(&invocation.get_field("hash").unwrap())?;

    let (chain, _) = open_chain(invocation)?;
    let block = chain.get_block(&hash)?;

    println!("{block:#?}");
    chain.close();

    Ok(())
}

fn db_field() -> Field {
    Field::new("db", FieldType::Pos(0), "Path to the chain database")
}

fn miner_field() -> Field {
    Field::new(
        "miner",
        FieldType::Pos(1),
        "Path to the mining account file",
    )
}

pub fn make_command_map() -> CommandMap<()> {
    let mut map: CommandMap<()> = HashMap::new();

    map.insert(
        String::from("create-account"),
        Command {
            processor: create_account,
            expected_fields: vec![Field::new(
                "path",
                FieldType::Pos(0),
                "Where to write the new account file",
            )],
            desc: String::from("Generate a new account and save it to a file"),
        },
    );

    map.insert(
        String::from("account-id"),
        Command {
            processor: account_id,
            expected_fields: vec![Field::new(
                "path",
                FieldType::Pos(0),
                "Path to an account file",
            )],
            desc: String::from("Print the account id of an account file"),
        },
    );

    map.insert(
        String::from("balance"),
        Command {
            processor: balance,
            expected_fields: vec![db_field(), miner_field()],
            desc: String::from(
                "Print an account's balance. Defaults to the miner; pass --account=<hex id> for someone else",
            ),
        },
    );

    map.insert(
        String::from("send"),
        Command {
            processor: send,
            expected_fields: vec![
                db_field(),
                miner_field(),
                Field::new("from", FieldType::Pos(2), "Path to the sender's account file"),
                Field::new("to", FieldType::Pos(3), "Recipient account id (hex)"),
                Field::new("value", FieldType::Pos(4), "Amount to send"),
            ],
            desc: String::from("Queue a payment and mine it into the next block"),
        },
    );

    map.insert(
        String::from("mine"),
        Command {
            processor: mine,
            expected_fields: vec![db_field(), miner_field()],
            desc: String::from("Mine the next block for the reward alone"),
        },
    );

    map.insert(
        String::from("add-key"),
        Command {
            processor: add_key,
            expected_fields: vec![
                db_field(),
                miner_field(),
                Field::new(
                    "account",
                    FieldType::Pos(2),
                    "Path to the account file whose public key should be registered",
                ),
            ],
            desc: String::from("Register an account's public key in the keystore"),
        },
    );

    map.insert(
        String::from("show-block"),
        Command {
            processor: show_block,
            expected_fields: vec![
                db_field(),
                miner_field(),
                Field::new("hash", FieldType::Pos(2), "Block hash (hex)"),
            ],
            desc: String::from("Print a stored block"),
        },
    );

    map
}
