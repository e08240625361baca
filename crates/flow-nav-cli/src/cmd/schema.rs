use anyhow::Result;

use crate::cmd::print_json;

pub fn run() -> Result<()> {
    print_json(&flow_nav::flow_schema())
}
