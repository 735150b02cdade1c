use sqlparser::dialect::Dialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::infrastructure::parser::sql_parser::ParseError;

/// SQL パーサーが知らない JPQL の構文を取り除いたトークン列
#[derive(Debug, Default)]
pub struct Rewritten {
    pub tokens: Vec<Token>,
    /// `join fetch m.team t` でフェッチ指定された関連パス (`m.team`)
    pub fetch_paths: Vec<String>,
    /// `select new a.b.MemberDto(..)` のコンストラクタ名
    pub constructor: Option<String>,
}

fn is_word(token: &Token, keyword: &str) -> bool {
    matches!(token, Token::Word(word) if word.quote_style.is_none() && word.value.eq_ignore_ascii_case(keyword))
}

/// 空白を読み飛ばした次のトークンの位置
fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    (from..tokens.len()).find(|&i| !matches!(tokens[i], Token::Whitespace(_)))
}

/// `a.b.c` の形の名前を読む。読み終えた次の位置と名前を返す。
fn dotted_name(tokens: &[Token], from: usize) -> Option<(usize, String)> {
    let mut index = next_significant(tokens, from)?;
    let mut parts = Vec::new();
    loop {
        match tokens.get(index) {
            Some(Token::Word(word)) => parts.push(word.value.clone()),
            _ => return None,
        }
        match tokens.get(index + 1) {
            Some(Token::Period) => index += 2,
            _ => return Some((index + 1, parts.join("."))),
        }
    }
}

/// JPQL 固有の `join fetch` と `select new` を取り除く
pub fn rewrite(dialect: &dyn Dialect, text: &str) -> Result<Rewritten, ParseError> {
    let tokens = Tokenizer::new(dialect, text)
        .tokenize()
        .map_err(|e| ParseError::SyntaxError(e.to_string()))?;

    let mut rewritten = Rewritten::default();
    let mut index = 0;
    // `select new X(` の開き括弧の深さ。対応する閉じ括弧を取り除く。
    let mut constructor_depth: Option<usize> = None;
    let mut depth = 0usize;

    while index < tokens.len() {
        let token = &tokens[index];

        if is_word(token, "join") {
            rewritten.tokens.push(token.clone());
            if let Some(fetch) = next_significant(&tokens, index + 1).filter(|&i| is_word(&tokens[i], "fetch")) {
                if let Some((_, path)) = dotted_name(&tokens, fetch + 1) {
                    rewritten.fetch_paths.push(path);
                }
                index = fetch + 1;
                continue;
            }
        } else if is_word(token, "new") && rewritten.constructor.is_none() {
            let (after, name) = dotted_name(&tokens, index + 1)
                .ok_or_else(|| ParseError::SyntaxError("expected a class name after NEW".to_string()))?;
            let open = next_significant(&tokens, after)
                .filter(|&i| tokens[i] == Token::LParen)
                .ok_or_else(|| ParseError::SyntaxError(format!("expected '(' after NEW {}", name)))?;
            rewritten.constructor = Some(name);
            depth += 1;
            constructor_depth = Some(depth);
            index = open + 1;
            continue;
        } else if *token == Token::LParen {
            depth += 1;
            rewritten.tokens.push(token.clone());
        } else if *token == Token::RParen {
            if constructor_depth == Some(depth) {
                constructor_depth = None;
                depth = depth.saturating_sub(1);
                index += 1;
                continue;
            }
            depth = depth.saturating_sub(1);
            rewritten.tokens.push(token.clone());
        } else {
            rewritten.tokens.push(token.clone());
        }
        index += 1;
    }

    if constructor_depth.is_some() {
        return Err(ParseError::SyntaxError("unclosed constructor expression".to_string()));
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::GenericDialect;

    fn text(rewritten: &Rewritten) -> String {
        rewritten.tokens.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn strips_fetch_and_records_path() {
        let rewritten = rewrite(&GenericDialect {}, "select m from Member m join fetch m.team t").unwrap();
        assert_eq!(text(&rewritten), "select m from Member m join m.team t");
        assert_eq!(rewritten.fetch_paths, vec!["m.team".to_string()]);
    }

    #[test]
    fn strips_constructor_expression() {
        let rewritten = rewrite(
            &GenericDialect {},
            "select new study.querydsl.dto.MemberDto(m.username, m.age) from Member m",
        )
        .unwrap();
        assert_eq!(text(&rewritten), "select m.username, m.age from Member m");
        assert_eq!(rewritten.constructor.as_deref(), Some("study.querydsl.dto.MemberDto"));
    }

    #[test]
    fn keeps_nested_parentheses_inside_constructor() {
        let rewritten = rewrite(
            &GenericDialect {},
            "select new MemberDto(m.username, max(m.age)) from Member m",
        )
        .unwrap();
        assert_eq!(text(&rewritten), "select m.username, max(m.age) from Member m");
    }

    #[test]
    fn plain_query_is_untouched() {
        let query = "select m from Member m where m.username = :username";
        let rewritten = rewrite(&GenericDialect {}, query).unwrap();
        assert_eq!(text(&rewritten), query);
        assert!(rewritten.fetch_paths.is_empty());
        assert!(rewritten.constructor.is_none());
    }
}
