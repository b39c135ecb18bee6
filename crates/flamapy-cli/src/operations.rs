//! Operations command - show the operation catalogue.

use anyhow::Result;
use clap::Args;
use console::style;
use serde_json::{json, Value};

use flamapy_bridge::{Operation, Technique};

#[derive(Args, Debug)]
pub struct OperationsArgs {
    /// Output format: text or json
    #[arg(short = 'f', long, default_value = "text")]
    pub format: String,
}

pub fn execute(args: OperationsArgs) -> Result<i32> {
    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&catalogue())?),
        "text" => print_table(),
        other => anyhow::bail!("Unknown format: {}", other),
    }
    Ok(0)
}

fn catalogue() -> Value {
    let operations: Vec<Value> = Operation::all()
        .iter()
        .map(|op| {
            let spec = op.spec();
            json!({
                "name": op.name(),
                "techniques": spec.techniques().iter().map(Technique::name).collect::<Vec<_>>(),
                "default": op.default_technique().name(),
                "parameters": spec.params.iter().map(|p| json!({
                    "name": p.name,
                    "type": p.kind.expected(),
                    "required": p.required,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    Value::Array(operations)
}

fn print_table() {
    for op in Operation::all() {
        let spec = op.spec();
        let techniques: Vec<&str> = spec.techniques().iter().map(Technique::name).collect();
        let params: Vec<String> = spec
            .params
            .iter()
            .map(|p| {
                if p.required {
                    format!("<{}>", p.name)
                } else {
                    format!("[{}]", p.name)
                }
            })
            .collect();

        println!(
            "  {:<34} {:<28} {}",
            style(op.name()).green(),
            techniques.join(", "),
            style(params.join(" ")).dim()
        );
    }
}
