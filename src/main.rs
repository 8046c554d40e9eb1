// main.rs
use std::io::{self, Write};

use anyhow::Result;

use portal_pql::api::RestQuery;
use portal_pql::engine::{self, ProjectionManager};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let projections = ProjectionManager::from_config();

    println!("--- PQL 查询转换 ---");
    println!(" 输入 PQL 查看解析结果 (输入 'quit' 退出)");
    println!("   :merge <pql> | <pql> ...   合并多个查询");
    println!("   :rest <pql>                 显示 REST 参数");
    println!("   :select <pql> | <字段>      添加投影");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input == "quit" || input == "exit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        if let Err(e) = handle_line(input, &projections) {
            println!("出错: {}", e);
        }
    }

    Ok(())
}

fn handle_line(input: &str, projections: &ProjectionManager) -> Result<()> {
    if let Some(rest) = input.strip_prefix(":merge") {
        let pqls = split_outside_quotes(rest, '|');
        println!("{}", engine::merge_pqls(&pqls)?);
    } else if let Some(rest) = input.strip_prefix(":rest") {
        let query = RestQuery::from_pql(rest)?;
        println!("{}", serde_json::to_string_pretty(&query)?);
    } else if let Some(rest) = input.strip_prefix(":select") {
        let (pql, field) = match split_outside_quotes(rest, '|').as_slice() {
            [pql, field] => (*pql, *field),
            _ => (rest, ""),
        };
        println!("{}", projections.add_projection(pql.trim(), field.trim())?);
    } else {
        let query = engine::from_text(input)?;
        println!("{}", serde_json::to_string_pretty(&query)?);
        println!(" [PQL]   {}", engine::to_text(&query));
        println!(" [Count] {}", engine::to_count_statement(input)?);
    }
    Ok(())
}

/// 按分隔符切分，双引号字符串内部（含转义）的分隔符不算
fn split_outside_quotes(input: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == delimiter {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_quoted_delimiters() {
        let parts = split_outside_quotes(r#" eq(a.b,"x|y") | eq(a.c,"q\"|") "#, '|');
        assert_eq!(parts, vec![r#" eq(a.b,"x|y") "#, r#" eq(a.c,"q\"|") "#]);
        assert_eq!(split_outside_quotes("eq(a.b,1)", '|'), vec!["eq(a.b,1)"]);
    }

    #[test]
    fn test_merge_command_with_pipe_in_value() {
        let pqls = split_outside_quotes(r#"eq(a.b,"x|y")|eq(a.c,2)"#, '|');
        let merged = engine::merge_pqls(&pqls).unwrap();
        assert_eq!(merged, r#"and(eq(a.b,"x|y"),eq(a.c,2))"#);
    }
}
