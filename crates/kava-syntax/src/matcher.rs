//! Recursive-descent matcher producing [`ParseMatch`] trees.
//!
//! Ambiguities of the C-family grammar (declaration vs. expression, cast vs.
//! parenthesized expression, generic `<` vs. less-than) are settled by
//! speculative matching with checkpoints.

use kava_core::Span;

use crate::error::SyntaxError;
use crate::lexer::{self, Token, TokenKind};
use crate::tree::ParseMatch;

type MatchResult<T> = Result<T, SyntaxError>;

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "short", "char", "int", "long", "float", "double",
];

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "private",
    "static",
    "final",
    "abstract",
    "synchronized",
];

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", ">>>=",
];

/// Binary operator levels from loosest to tightest binding.
const BINARY_LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["|"],
    &["^"],
    &["&"],
    &["==", "!="],
    &["<", ">", "<=", ">="],
    &["<<", ">>", ">>>"],
    &["+", "-"],
    &["*", "/", "%"],
];

const RELATIONAL_LEVEL: usize = 6;

/// Match a whole script: a sequence of imports, declarations and statements.
pub fn parse_program(source: &str) -> MatchResult<ParseMatch> {
    let mut matcher = Matcher::new(source)?;
    let mut items = Vec::new();
    while !matcher.at_end() {
        items.push(matcher.statement()?);
    }
    Ok(ParseMatch::node(
        "program",
        Span::new(0, source.len()),
        items,
    ))
}

/// Match a single expression spanning the whole input.
pub fn parse_expression(source: &str) -> MatchResult<ParseMatch> {
    let mut matcher = Matcher::new(source)?;
    let expr = matcher.expression()?;
    if !matcher.at_end() {
        return Err(matcher.unexpected("end of input"));
    }
    Ok(expr)
}

struct Checkpoint {
    pos: usize,
    splits: usize,
    last_end: usize,
}

struct Matcher<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    last_end: usize,
    /// Tokens narrowed by splitting `>>` while closing type arguments,
    /// with their original spans, so rewinding can restore them.
    splits: Vec<(usize, Span)>,
}

impl<'s> Matcher<'s> {
    fn new(source: &'s str) -> MatchResult<Self> {
        Ok(Self {
            source,
            tokens: lexer::tokenize(source)?,
            pos: 0,
            last_end: 0,
            splits: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn is_comment(token: &Token) -> bool {
        matches!(token.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    fn skip_comments(&mut self) {
        while self.tokens.get(self.pos).is_some_and(Self::is_comment) {
            self.pos += 1;
        }
    }

    /// The `n`th significant token from the cursor.
    fn peek_nth(&self, n: usize) -> Option<Token> {
        self.tokens
            .iter()
            .skip(self.pos)
            .filter(|t| !Self::is_comment(t))
            .nth(n)
            .copied()
    }

    fn peek(&self) -> Option<Token> {
        self.peek_nth(0)
    }

    fn at_end(&self) -> bool {
        self.peek().is_none()
    }

    fn token_text(&self, token: Token) -> &'s str {
        &self.source[token.span.start..token.span.end]
    }

    fn nth_is(&self, n: usize, text: &str) -> bool {
        self.peek_nth(n).is_some_and(|t| {
            matches!(t.kind, TokenKind::Punct | TokenKind::Ident) && self.token_text(t) == text
        })
    }

    fn at(&self, text: &str) -> bool {
        self.nth_is(0, text)
    }

    fn at_any(&self, texts: &[&str]) -> Option<&'s str> {
        texts.iter().find(|t| self.at(t)).and_then(|_| {
            let token = self.peek()?;
            Some(self.token_text(token))
        })
    }

    fn advance(&mut self) -> Option<Token> {
        self.skip_comments();
        let token = self.tokens.get(self.pos).copied()?;
        self.pos += 1;
        self.last_end = token.span.end;
        Some(token)
    }

    fn eat(&mut self, text: &str) -> Option<Span> {
        if self.at(text) {
            self.advance().map(|t| t.span)
        } else {
            None
        }
    }

    fn expect(&mut self, text: &str) -> MatchResult<Span> {
        self.eat(text)
            .ok_or_else(|| self.unexpected(&format!("`{text}`")))
    }

    fn unexpected(&self, wanted: &str) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError::new(
                format!("expected {wanted}, found `{}`", self.token_text(token)),
                token.span,
            ),
            None => SyntaxError::new(
                format!("expected {wanted}, found end of input"),
                Span::new(self.source.len(), self.source.len()),
            ),
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            splits: self.splits.len(),
            last_end: self.last_end,
        }
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        while self.splits.len() > checkpoint.splits {
            if let Some((index, span)) = self.splits.pop() {
                self.tokens[index].span = span;
            }
        }
        self.pos = checkpoint.pos;
        self.last_end = checkpoint.last_end;
    }

    /// Run `f` speculatively; on failure the cursor is restored.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> MatchResult<T>) -> Option<T> {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.rewind(checkpoint);
                None
            }
        }
    }

    fn leaf(&mut self, kind: &str) -> MatchResult<ParseMatch> {
        let token = self.advance().ok_or_else(|| self.unexpected(kind))?;
        Ok(ParseMatch::leaf(kind, token.span))
    }

    fn keyword_leaf(&mut self, word: &str) -> MatchResult<ParseMatch> {
        let span = self.expect(word)?;
        Ok(ParseMatch::leaf(word, span))
    }

    fn at_identifier(&self) -> bool {
        self.peek().is_some_and(|t| {
            t.kind == TokenKind::Ident && !lexer::is_keyword(self.token_text(t))
        })
    }

    fn identifier(&mut self) -> MatchResult<ParseMatch> {
        if !self.at_identifier() {
            return Err(self.unexpected("identifier"));
        }
        self.leaf("identifier")
    }

    /// Consume one `>` closing a type-argument list, splitting `>>`, `>>>`
    /// and friends when necessary.
    fn close_angle(&mut self) -> MatchResult<()> {
        if self.eat(">").is_some() {
            return Ok(());
        }
        self.skip_comments();
        let Some(token) = self.tokens.get(self.pos).copied() else {
            return Err(self.unexpected("`>`"));
        };
        let text = self.token_text(token);
        if token.kind == TokenKind::Punct && text.len() > 1 && text.starts_with('>') {
            self.splits.push((self.pos, token.span));
            self.tokens[self.pos].span.start += 1;
            self.last_end = token.span.start + 1;
            return Ok(());
        }
        Err(self.unexpected("`>`"))
    }

    fn node(&self, kind: &str, start: usize, children: Vec<ParseMatch>) -> ParseMatch {
        ParseMatch::node(kind, Span::new(start, self.last_end), children)
    }

    fn start(&self) -> usize {
        self.peek().map(|t| t.span.start).unwrap_or(self.source.len())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> MatchResult<ParseMatch> {
        if let Some(token) = self.tokens.get(self.pos).copied() {
            if Self::is_comment(&token) {
                self.pos += 1;
                return Ok(ParseMatch::leaf("comment", token.span));
            }
        }
        let Some(token) = self.peek() else {
            return Err(self.unexpected("statement"));
        };
        let start = token.span.start;
        match self.token_text(token) {
            "{" => self.block(),
            ";" => {
                self.advance();
                Ok(ParseMatch::leaf("empty_statement", token.span))
            }
            "if" => self.if_statement(),
            "while" => {
                self.advance();
                let cond = self.paren_expression()?;
                let body = self.statement()?;
                Ok(self.node("while_statement", start, vec![cond, body]))
            }
            "do" => {
                self.advance();
                let body = self.statement()?;
                self.expect("while")?;
                let cond = self.paren_expression()?;
                self.expect(";")?;
                Ok(self.node("do_statement", start, vec![body, cond]))
            }
            "for" => self.for_statement(),
            "switch" => self.switch_statement(),
            "synchronized" if self.nth_is(1, "(") => {
                self.advance();
                let lock = self.paren_expression()?;
                let body = self.block()?;
                Ok(self.node("synchronized_statement", start, vec![lock, body]))
            }
            "throw" => {
                self.advance();
                let value = self.expression()?;
                self.expect(";")?;
                Ok(self.node("throw_statement", start, vec![value]))
            }
            "return" => {
                self.advance();
                let mut children = Vec::new();
                if !self.at(";") {
                    children.push(self.expression()?);
                }
                self.expect(";")?;
                Ok(self.node("return_statement", start, children))
            }
            "break" | "continue" => {
                let kind = if self.at("break") {
                    "break_statement"
                } else {
                    "continue_statement"
                };
                self.advance();
                self.expect(";")?;
                Ok(self.node(kind, start, Vec::new()))
            }
            "try" => self.try_statement(),
            "import" => self.import_declaration(),
            "drop"
                if self
                    .peek_nth(1)
                    .is_some_and(|t| t.kind == TokenKind::Ident) =>
            {
                self.drop_statement()
            }
            _ => self.declaration_or_expression(),
        }
    }

    fn block(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("{")?.start;
        let mut statements = Vec::new();
        while !self.at("}") {
            if self.at_end() {
                return Err(self.unexpected("`}`"));
            }
            statements.push(self.statement()?);
        }
        self.expect("}")?;
        Ok(self.node("block", start, statements))
    }

    fn paren_expression(&mut self) -> MatchResult<ParseMatch> {
        self.expect("(")?;
        let expr = self.expression()?;
        self.expect(")")?;
        Ok(expr)
    }

    fn if_statement(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("if")?.start;
        let cond = self.paren_expression()?;
        let then = self.statement()?;
        let mut children = vec![cond, then];
        if self.eat("else").is_some() {
            children.push(self.statement()?);
        }
        Ok(self.node("if_statement", start, children))
    }

    fn for_statement(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("for")?.start;
        self.expect("(")?;

        let enhanced = self.attempt(|m| {
            let var_start = m.start();
            let mut children = Vec::new();
            if let Some(span) = m.eat("final") {
                children.push(ParseMatch::leaf("final", span));
            }
            children.push(m.type_()?);
            children.push(m.identifier()?);
            m.expect(":")?;
            Ok(m.node("loop_variable", var_start, children))
        });
        if let Some(variable) = enhanced {
            let iterable = self.expression()?;
            self.expect(")")?;
            let body = self.statement()?;
            return Ok(self.node(
                "enhanced_for_statement",
                start,
                vec![variable, iterable, body],
            ));
        }

        let init_start = self.start();
        let mut init = Vec::new();
        if !self.at(";") {
            match self.attempt(|m| m.local_declaration_head()) {
                Some((modifiers, ty)) => init.push(self.local_declaration_rest(init_start, modifiers, ty)?),
                None => {
                    init.push(self.expression()?);
                    while self.eat(",").is_some() {
                        init.push(self.expression()?);
                    }
                }
            }
        }
        let init = self.node("for_init", init_start, init);
        self.expect(";")?;

        let cond_start = self.start();
        let mut cond = Vec::new();
        if !self.at(";") {
            cond.push(self.expression()?);
        }
        let cond = self.node("for_condition", cond_start, cond);
        self.expect(";")?;

        let update_start = self.start();
        let mut update = Vec::new();
        if !self.at(")") {
            update.push(self.expression()?);
            while self.eat(",").is_some() {
                update.push(self.expression()?);
            }
        }
        let update = self.node("for_update", update_start, update);
        self.expect(")")?;
        let body = self.statement()?;
        Ok(self.node("for_statement", start, vec![init, cond, update, body]))
    }

    fn switch_statement(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("switch")?.start;
        let value = self.paren_expression()?;
        let block_start = self.expect("{")?.start;
        let mut entries = Vec::new();
        while !self.at("}") {
            if self.at_end() {
                return Err(self.unexpected("`}`"));
            }
            let label_start = self.start();
            if self.eat("case").is_some() {
                let label = self.expression()?;
                self.expect(":")?;
                entries.push(self.node("switch_label", label_start, vec![label]));
            } else if self.at("default") {
                let default = self.keyword_leaf("default")?;
                self.expect(":")?;
                entries.push(self.node("switch_label", label_start, vec![default]));
            } else {
                entries.push(self.statement()?);
            }
        }
        self.expect("}")?;
        let block = self.node("switch_block", block_start, entries);
        Ok(self.node("switch_statement", start, vec![value, block]))
    }

    fn try_statement(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("try")?.start;
        let mut children = vec![self.block()?];
        while self.at("catch") {
            let catch_start = self.start();
            self.advance();
            self.expect("(")?;
            self.eat("final");
            let types_start = self.start();
            let mut types = vec![self.type_()?];
            while self.eat("|").is_some() {
                types.push(self.type_()?);
            }
            let catch_type = self.node("catch_type", types_start, types);
            let name = self.identifier()?;
            self.expect(")")?;
            let body = self.block()?;
            children.push(self.node("catch_clause", catch_start, vec![catch_type, name, body]));
        }
        if self.at("finally") {
            let finally_start = self.start();
            self.advance();
            let body = self.block()?;
            children.push(self.node("finally_clause", finally_start, vec![body]));
        }
        Ok(self.node("try_statement", start, children))
    }

    fn import_declaration(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("import")?.start;
        let mut children = Vec::new();
        if let Some(span) = self.eat("static") {
            children.push(ParseMatch::leaf("static", span));
        }
        let name_start = self.start();
        let mut segments = vec![self.identifier()?];
        let mut asterisk = None;
        while self.eat(".").is_some() {
            if let Some(span) = self.eat("*") {
                asterisk = Some(ParseMatch::leaf("asterisk", span));
                break;
            }
            segments.push(self.identifier()?);
        }
        let end = segments.last().map(|s| s.span.end).unwrap_or(name_start);
        children.push(ParseMatch::node(
            "qualified_name",
            Span::new(name_start, end),
            segments,
        ));
        children.extend(asterisk);
        self.expect(";")?;
        Ok(self.node("import_declaration", start, children))
    }

    fn drop_statement(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        self.advance();
        let mut children = vec![self.identifier()?];
        if self.at("(") {
            let types_start = self.expect("(")?.start;
            let mut types = Vec::new();
            if !self.at(")") {
                types.push(self.type_()?);
                while self.eat(",").is_some() {
                    types.push(self.type_()?);
                }
            }
            self.expect(")")?;
            children.push(self.node("formal_types", types_start, types));
        }
        self.expect(";")?;
        Ok(self.node("drop_statement", start, children))
    }

    fn modifiers(&mut self) -> Option<ParseMatch> {
        let start = self.start();
        let mut words = Vec::new();
        while let Some(word) = self.at_any(MODIFIERS) {
            // `synchronized (` opens a statement, not a modifier list.
            if word == "synchronized" && self.nth_is(1, "(") {
                break;
            }
            if let Some(token) = self.advance() {
                words.push(ParseMatch::leaf(word, token.span));
            }
        }
        (!words.is_empty()).then(|| self.node("modifiers", start, words))
    }

    fn declaration_or_expression(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        let checkpoint = self.checkpoint();
        self.modifiers();
        if let Some(token) = self.peek().filter(|_| self.at("<")) {
            return Err(SyntaxError::new(
                "generic functions are not supported",
                token.span,
            ));
        }
        self.rewind(checkpoint);
        if let Some((modifiers, ty, name)) = self.attempt(|m| {
            let modifiers = m.modifiers();
            let ty = m.return_type()?;
            let name = m.identifier()?;
            if !m.at("(") {
                return Err(m.unexpected("`(`"));
            }
            Ok((modifiers, ty, name))
        }) {
            return self.function_rest(start, modifiers, ty, name);
        }
        if let Some((modifiers, ty)) = self.attempt(|m| m.local_declaration_head()) {
            let declaration = self.local_declaration_rest(start, modifiers, ty)?;
            self.expect(";")?;
            return Ok(declaration);
        }
        let expr = self.expression()?;
        self.expect(";")?;
        Ok(self.node("expression_statement", start, vec![expr]))
    }

    /// `[modifiers] Type name` followed by something a declarator allows.
    fn local_declaration_head(&mut self) -> MatchResult<(Option<ParseMatch>, ParseMatch)> {
        let modifiers = self.modifiers();
        let ty = self.type_()?;
        if !self.at_identifier() {
            return Err(self.unexpected("identifier"));
        }
        if !(self.nth_is(1, "=")
            || self.nth_is(1, ",")
            || self.nth_is(1, ";")
            || self.nth_is(1, "[")
            || self.nth_is(1, ":"))
        {
            return Err(self.unexpected("declarator"));
        }
        Ok((modifiers, ty))
    }

    fn local_declaration_rest(
        &mut self,
        start: usize,
        modifiers: Option<ParseMatch>,
        ty: ParseMatch,
    ) -> MatchResult<ParseMatch> {
        let mut children = Vec::new();
        children.extend(modifiers);
        children.push(ty);
        loop {
            children.push(self.declarator()?);
            if self.eat(",").is_none() {
                break;
            }
        }
        Ok(self.node("local_declaration", start, children))
    }

    fn declarator(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        let mut children = vec![self.identifier()?];
        children.extend(self.dims());
        if self.eat("=").is_some() {
            children.push(self.variable_initializer()?);
        }
        Ok(self.node("declarator", start, children))
    }

    fn variable_initializer(&mut self) -> MatchResult<ParseMatch> {
        if self.at("{") {
            self.array_initializer()
        } else {
            self.expression()
        }
    }

    fn array_initializer(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("{")?.start;
        let mut elements = Vec::new();
        while !self.at("}") {
            elements.push(self.variable_initializer()?);
            if self.eat(",").is_none() {
                break;
            }
        }
        self.expect("}")?;
        Ok(self.node("array_initializer", start, elements))
    }

    fn return_type(&mut self) -> MatchResult<ParseMatch> {
        if self.at("void") {
            let start = self.start();
            let span = self.expect("void")?;
            let void = ParseMatch::leaf("primitive_type", span);
            return Ok(self.node("type", start, vec![void]));
        }
        self.type_()
    }

    fn function_rest(
        &mut self,
        start: usize,
        modifiers: Option<ParseMatch>,
        ty: ParseMatch,
        name: ParseMatch,
    ) -> MatchResult<ParseMatch> {
        let mut children = Vec::new();
        children.push(modifiers.unwrap_or_else(|| {
            ParseMatch::leaf("modifiers", Span::new(start, start))
        }));
        children.push(ty);
        children.push(name);

        let params_start = self.expect("(")?.start;
        let mut params = Vec::new();
        if !self.at(")") {
            loop {
                params.push(self.formal_parameter()?);
                if self.eat(",").is_none() {
                    break;
                }
            }
        }
        self.expect(")")?;
        children.push(self.node("formal_parameters", params_start, params));

        if self.at("throws") {
            let throws_start = self.start();
            self.advance();
            let mut types = vec![self.type_()?];
            while self.eat(",").is_some() {
                types.push(self.type_()?);
            }
            children.push(self.node("throws", throws_start, types));
        }
        children.push(self.block()?);
        Ok(self.node("function_declaration", start, children))
    }

    fn formal_parameter(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        let mut children = Vec::new();
        if let Some(span) = self.eat("final") {
            children.push(ParseMatch::leaf("final", span));
        }
        children.push(self.type_()?);
        if let Some(span) = self.eat("...") {
            children.push(ParseMatch::leaf("varargs", span));
        }
        children.push(self.identifier()?);
        children.extend(self.dims());
        Ok(self.node("formal_parameter", start, children))
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn at_primitive(&self) -> bool {
        self.at_any(PRIMITIVES).is_some()
    }

    /// `Type` = (primitive | class type) followed by `[]` pairs.
    fn type_(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        let base = if self.at_primitive() {
            self.leaf("primitive_type")?
        } else {
            self.class_type()?
        };
        let mut children = vec![base];
        children.extend(self.dims());
        Ok(self.node("type", start, children))
    }

    fn class_type(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        let mut children = vec![self.identifier()?];
        while self.at(".") && self.peek_nth(1).is_some_and(|t| t.kind == TokenKind::Ident) {
            let Some(next) = self.peek_nth(1) else { break };
            if lexer::is_keyword(self.token_text(next)) {
                break;
            }
            self.advance();
            children.push(self.identifier()?);
        }
        if self.at("<") {
            children.push(self.type_arguments()?);
        }
        Ok(self.node("class_type", start, children))
    }

    fn type_arguments(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("<")?.start;
        let mut args = Vec::new();
        loop {
            if self.at("?") {
                let wildcard_start = self.start();
                self.advance();
                let mut children = Vec::new();
                if let Some(word) = self.at_any(&["extends", "super"]) {
                    children.push(self.keyword_leaf(word)?);
                    children.push(self.type_()?);
                }
                args.push(self.node("wildcard", wildcard_start, children));
            } else {
                args.push(self.type_()?);
            }
            if self.eat(",").is_none() {
                break;
            }
        }
        self.close_angle()?;
        Ok(self.node("type_arguments", start, args))
    }

    /// Zero or more `[]` pairs, each reported as one `dim` match.
    fn dims(&mut self) -> Option<ParseMatch> {
        let start = self.start();
        let mut dims = Vec::new();
        while self.at("[") && self.nth_is(1, "]") {
            let open = self.expect("[").ok()?;
            let close = self.expect("]").ok()?;
            dims.push(ParseMatch::leaf("dim", open.to(close)));
        }
        (!dims.is_empty()).then(|| self.node("dims", start, dims))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> MatchResult<ParseMatch> {
        self.assignment()
    }

    fn assignment(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        let lhs = self.conditional()?;
        if self.at_any(ASSIGNMENT_OPERATORS).is_some() {
            let op = self.leaf("assignment_operator")?;
            let rhs = self.assignment()?;
            return Ok(self.node("assignment", start, vec![lhs, op, rhs]));
        }
        Ok(lhs)
    }

    fn conditional(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        let cond = self.binary(0)?;
        if self.eat("?").is_some() {
            let then = self.expression()?;
            self.expect(":")?;
            let otherwise = self.conditional()?;
            return Ok(self.node("conditional", start, vec![cond, then, otherwise]));
        }
        Ok(cond)
    }

    /// One precedence level, emitted flat: `[operand, operator, operand, ...]`.
    fn binary(&mut self, level: usize) -> MatchResult<ParseMatch> {
        if level == BINARY_LEVELS.len() {
            return self.unary();
        }
        let start = self.start();
        let mut operands = vec![self.binary(level + 1)?];
        loop {
            if level == RELATIONAL_LEVEL && self.at("instanceof") {
                let subject = self.fold_operands(start, std::mem::take(&mut operands));
                self.advance();
                let ty = self.type_()?;
                operands.push(self.node("instanceof_expression", start, vec![subject, ty]));
                continue;
            }
            if self.at_any(BINARY_LEVELS[level]).is_some() {
                operands.push(self.leaf("operator")?);
                operands.push(self.binary(level + 1)?);
                continue;
            }
            break;
        }
        Ok(self.fold_operands(start, operands))
    }

    fn fold_operands(&self, start: usize, mut operands: Vec<ParseMatch>) -> ParseMatch {
        if operands.len() == 1 {
            operands.remove(0)
        } else {
            self.node("binary", start, operands)
        }
    }

    fn unary(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        if self.at_any(&["+", "-", "++", "--", "!", "~"]).is_some() {
            let op = self.leaf("operator")?;
            let operand = self.unary()?;
            return Ok(self.node("unary", start, vec![op, operand]));
        }
        if self.at("(") {
            if let Some(cast) = self.attempt(|m| m.cast(start)) {
                return Ok(cast);
            }
        }
        let mut expr = self.postfix_chain()?;
        while self.at_any(&["++", "--"]).is_some() {
            let op = self.leaf("operator")?;
            expr = self.node("unary", start, vec![expr, op]);
        }
        Ok(expr)
    }

    fn cast(&mut self, start: usize) -> MatchResult<ParseMatch> {
        self.expect("(")?;
        let primitive = self.at_primitive();
        let ty = self.type_()?;
        self.expect(")")?;
        if !primitive && !self.starts_cast_operand() {
            return Err(self.unexpected("cast operand"));
        }
        let operand = self.unary()?;
        Ok(self.node("cast_expression", start, vec![ty, operand]))
    }

    /// Tokens that may follow `(Reference)` in a cast; `+` and `-` are
    /// excluded so `(a) - b` stays a subtraction.
    fn starts_cast_operand(&self) -> bool {
        let Some(token) = self.peek() else {
            return false;
        };
        match token.kind {
            TokenKind::Integer | TokenKind::Floating | TokenKind::Str | TokenKind::Char => true,
            TokenKind::Ident => {
                let text = self.token_text(token);
                !lexer::is_keyword(text)
                    || matches!(text, "this" | "new" | "true" | "false" | "null" | "super")
                    || PRIMITIVES.contains(&text)
            }
            TokenKind::Punct => matches!(self.token_text(token), "(" | "!" | "~"),
            _ => false,
        }
    }

    fn arguments(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("(")?.start;
        let mut args = Vec::new();
        if !self.at(")") {
            loop {
                args.push(self.expression()?);
                if self.eat(",").is_none() {
                    break;
                }
            }
        }
        self.expect(")")?;
        Ok(self.node("arguments", start, args))
    }

    fn postfix_chain(&mut self) -> MatchResult<ParseMatch> {
        let start = self.start();
        let mut expr = self.primary()?;
        loop {
            if self.at("[") {
                if self.nth_is(1, "]") {
                    // `Name[].class`
                    let dims = self.dims().into_iter().collect::<Vec<_>>();
                    self.expect(".")?;
                    self.expect("class")?;
                    let mut children = vec![expr];
                    children.extend(dims);
                    expr = self.node("class_literal", start, children);
                    continue;
                }
                self.advance();
                let index = self.expression()?;
                self.expect("]")?;
                expr = self.node("array_access", start, vec![expr, index]);
                continue;
            }
            if self.at(".") {
                self.advance();
                if self.eat("class").is_some() {
                    expr = self.node("class_literal", start, vec![expr]);
                    continue;
                }
                let mut children = vec![expr];
                if self.at("<") {
                    children.push(self.type_arguments()?);
                }
                children.push(self.identifier()?);
                if self.at("(") {
                    children.push(self.arguments()?);
                    expr = self.node("method_invocation", start, children);
                } else {
                    expr = self.node("field_access", start, children);
                }
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn primary(&mut self) -> MatchResult<ParseMatch> {
        let Some(token) = self.peek() else {
            return Err(self.unexpected("expression"));
        };
        let start = token.span.start;
        match token.kind {
            TokenKind::Integer | TokenKind::Floating => return self.leaf("number_literal"),
            TokenKind::Str => return self.leaf("string_literal"),
            TokenKind::Char => return self.leaf("char_literal"),
            _ => {}
        }
        let text = self.token_text(token);
        match text {
            "(" => {
                self.advance();
                let inner = self.expression()?;
                self.expect(")")?;
                Ok(self.node("parenthesized", start, vec![inner]))
            }
            "true" | "false" => self.leaf("boolean_literal"),
            "null" => self.leaf("null_literal"),
            "this" => self.leaf("this"),
            "new" => self.creation(),
            _ if PRIMITIVES.contains(&text) || text == "void" => {
                let ty = self.return_type()?;
                self.expect(".")?;
                self.expect("class")?;
                Ok(self.node("class_literal", start, vec![ty]))
            }
            _ if self.at_identifier() => {
                let name = self.identifier()?;
                if self.at("(") {
                    let args = self.arguments()?;
                    return Ok(self.node("method_invocation", start, vec![name, args]));
                }
                Ok(name)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn creation(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("new")?.start;
        let base = if self.at_primitive() {
            self.leaf("primitive_type")?
        } else {
            self.class_type()?
        };
        if self.at("(") {
            let args = self.arguments()?;
            let mut children = vec![base, args];
            if self.at("{") {
                children.push(self.class_body()?);
            }
            return Ok(self.node("object_creation", start, children));
        }
        let mut children = vec![base];
        let mut sized = false;
        while self.at("[") && !self.nth_is(1, "]") {
            let dim_start = self.expect("[")?.start;
            let size = self.expression()?;
            self.expect("]")?;
            children.push(self.node("dim_expr", dim_start, vec![size]));
            sized = true;
        }
        let dims = self.dims();
        if !sized && dims.is_none() {
            return Err(self.unexpected("`(` or `[`"));
        }
        children.extend(dims);
        if !sized {
            children.push(self.array_initializer()?);
        }
        Ok(self.node("array_creation", start, children))
    }

    fn class_body(&mut self) -> MatchResult<ParseMatch> {
        let start = self.expect("{")?.start;
        let mut members = Vec::new();
        while !self.at("}") {
            if self.at_end() {
                return Err(self.unexpected("`}`"));
            }
            members.push(self.statement()?);
        }
        self.expect("}")?;
        Ok(self.node("class_body", start, members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(source: &str) -> String {
        parse_program(source).unwrap().outline(source)
    }

    #[test]
    fn binary_levels_stay_flat() {
        let source = "a + b - c * d;";
        insta::assert_snapshot!(outline(source), @r"
        program
          expression_statement
            binary
              identifier `a`
              operator `+`
              identifier `b`
              operator `-`
              binary
                identifier `c`
                operator `*`
                identifier `d`
        ");
    }

    #[test]
    fn unary_operators_keep_source_order() {
        let source = "-x; y++;";
        insta::assert_snapshot!(outline(source), @r"
        program
          expression_statement
            unary
              operator `-`
              identifier `x`
          expression_statement
            unary
              identifier `y`
              operator `++`
        ");
    }

    #[test]
    fn generic_declaration_versus_comparison() {
        let decl = parse_program("List<List<String>> xs;").unwrap();
        assert_eq!(decl.children[0].kind, "local_declaration");
        let cmp = parse_program("a < b;").unwrap();
        assert_eq!(cmp.children[0].kind, "expression_statement");
        let shift = parse_program("x = a >> b;").unwrap();
        assert_eq!(shift.children[0].children[0].kind, "assignment");
    }

    #[test]
    fn cast_versus_parenthesized() {
        let cast = parse_expression("(String) o").unwrap();
        assert_eq!(cast.kind, "cast_expression");
        let sub = parse_expression("(a) - b").unwrap();
        assert_eq!(sub.kind, "binary");
        let prim = parse_expression("(int) -x").unwrap();
        assert_eq!(prim.kind, "cast_expression");
    }

    #[test]
    fn function_declaration_shape() {
        let source = "static int sum(int... xs) throws Exception { return 0; }";
        let program = parse_program(source).unwrap();
        let func = &program.children[0];
        assert_eq!(func.kind, "function_declaration");
        let kinds: Vec<_> = func.children.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(
            kinds,
            ["modifiers", "type", "identifier", "formal_parameters", "throws", "block"]
        );
        let param = &func.children[3].children[0];
        assert!(param.child("varargs").is_some());
    }

    #[test]
    fn array_creation_records_every_bracket_pair() {
        let source = "new int[3][][]";
        let expr = parse_expression(source).unwrap();
        assert_eq!(expr.kind, "array_creation");
        assert_eq!(expr.children_of("dim_expr").count(), 1);
        assert_eq!(expr.child("dims").unwrap().children.len(), 2);
    }

    #[test]
    fn comments_become_statements() {
        let program = parse_program("// note\nint x;").unwrap();
        assert_eq!(program.children[0].kind, "comment");
        assert_eq!(program.children[1].kind, "local_declaration");
    }

    #[test]
    fn enhanced_for_and_switch() {
        let source = "for (String s : xs) { switch (s) { case \"a\": break; default: } }";
        let program = parse_program(source).unwrap();
        let for_stmt = &program.children[0];
        assert_eq!(for_stmt.kind, "enhanced_for_statement");
        let switch = &for_stmt.children[2].children[0];
        assert_eq!(switch.kind, "switch_statement");
        let block = switch.child("switch_block").unwrap();
        assert_eq!(block.children_of("switch_label").count(), 2);
    }

    #[test]
    fn type_parameters_on_functions_are_rejected() {
        let err = parse_program("<T> T id(T x) { return x; }").unwrap_err();
        assert_eq!(err.message, "generic functions are not supported");
        assert_eq!(err.span, Span::new(0, 1));
        let err = parse_program("static <T extends Comparable<T>> T max(T a, T b) { return a; }")
            .unwrap_err();
        assert_eq!(err.message, "generic functions are not supported");
        assert_eq!(err.span, Span::new(7, 8));
    }

    #[test]
    fn reports_position_of_unexpected_token() {
        let err = parse_program("int x = ;").unwrap_err();
        assert_eq!(err.span, Span::new(8, 9));
    }
}
