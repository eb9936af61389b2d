//! The AST node model.
//!
//! Every syntactic form is one [`NodeKind`] variant. Children live in owned
//! slots; [`Node::children`] lists them in evaluation order and
//! [`Node::replace`] swaps one out after checking that the replacement fits
//! the slot.

use std::fmt;
use std::rc::Rc;

use derive_more::Display;
use kava_core::Span;

use crate::error::EditError;
use crate::function::FunctionDecl;
use crate::literal::Literal;
use crate::type_ref::TypeRef;

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// A comment or empty statement.
    NoOp,
    Literal(Literal),
    Identifier(String),
    Keyword(Keyword),
    /// A type in expression position (cast target, `instanceof`, class
    /// literal).
    Type(TypeRef),
    ArrayIndex {
        array: Box<Node>,
        index: Box<Node>,
    },
    /// `{a, b, c}`. `ty` is the array type when known from context.
    ArrayInit {
        ty: Option<TypeRef>,
        items: Vec<Node>,
    },
    Assign {
        op: AssignOp,
        target: Box<Node>,
        value: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Cast {
        ty: Box<Node>,
        operand: Box<Node>,
    },
    Conditional {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    /// `new T(args)`, with a class body for anonymous classes.
    New {
        class: TypeRef,
        args: Vec<Node>,
        body: Option<Vec<Node>>,
    },
    /// `new T[n][m][]` or `new T[]{...}`. `dims` counts every bracket pair.
    NewArray {
        element: TypeRef,
        sizes: Vec<Node>,
        dims: u32,
        init: Option<Box<Node>>,
    },
    Declaration(Declaration),
    /// `int a = 1, b;`
    DeclarationList(Vec<Node>),
    /// Undo a variable declaration, or a function declaration when
    /// parameter types are given.
    Drop {
        name: String,
        params: Option<Vec<TypeRef>>,
    },
    ForEach {
        variable: Box<Node>,
        iterable: Box<Node>,
        body: Box<Node>,
    },
    For {
        init: Vec<Node>,
        cond: Option<Box<Node>>,
        update: Vec<Node>,
        body: Box<Node>,
    },
    While {
        cond: Box<Node>,
        body: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        cond: Box<Node>,
    },
    If {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    Function(Rc<FunctionDecl>),
    FieldAccess {
        target: Box<Node>,
        name: String,
    },
    MethodCall {
        target: Option<Box<Node>>,
        type_args: Vec<TypeRef>,
        name: String,
        args: Vec<Node>,
    },
    Import(Import),
    InstanceOf {
        operand: Box<Node>,
        ty: Box<Node>,
    },
    Block(Vec<Node>),
    Switch {
        value: Box<Node>,
        cases: Vec<SwitchCase>,
    },
    Synchronized {
        lock: Box<Node>,
        body: Box<Node>,
    },
    Throw(Box<Node>),
    Return(Option<Box<Node>>),
    Try {
        body: Box<Node>,
        catches: Vec<CatchClause>,
        finally: Option<Box<Node>>,
    },
    ClassLiteral(Box<Node>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum Keyword {
    #[display("this")]
    This,
    #[display("break")]
    Break,
    #[display("continue")]
    Continue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub ty: TypeRef,
    pub name: String,
    pub is_final: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Import {
    /// `import java.util.List;`
    Class(String),
    /// `import java.util.*;`
    Package(String),
    /// `import static java.lang.Math.max;`
    StaticMember { owner: String, member: String },
    /// `import static java.lang.Math.*;`
    Static { owner: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default`.
    pub label: Option<Node>,
    pub body: Vec<Node>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause {
    /// More than one for a multi-catch.
    pub types: Vec<TypeRef>,
    pub name: String,
    pub body: Node,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum BinaryOp {
    #[display("||")]
    Or,
    #[display("&&")]
    And,
    #[display("|")]
    BitOr,
    #[display("^")]
    BitXor,
    #[display("&")]
    BitAnd,
    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<")]
    Lt,
    #[display(">")]
    Gt,
    #[display("<=")]
    Le,
    #[display(">=")]
    Ge,
    #[display("<<")]
    Shl,
    #[display(">>")]
    Shr,
    #[display(">>>")]
    UShr,
    #[display("+")]
    Add,
    #[display("-")]
    Sub,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
    #[display("%")]
    Rem,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "||" => BinaryOp::Or,
            "&&" => BinaryOp::And,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "&" => BinaryOp::BitAnd,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            ">>>" => BinaryOp::UShr,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            _ => return None,
        })
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::BitAnd)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }
}

/// `=` or a compound assignment such as `+=`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}

impl AssignOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        if symbol == "=" {
            return Some(AssignOp::Assign);
        }
        match BinaryOp::from_symbol(symbol.strip_suffix('=')?)? {
            BinaryOp::Or
            | BinaryOp::And
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => None,
            op => Some(AssignOp::Compound(op)),
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignOp::Assign => f.write_str("="),
            AssignOp::Compound(op) => write!(f, "{op}="),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum UnaryOp {
    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("!")]
    Not,
    #[display("~")]
    BitNot,
    #[display("++")]
    PreIncrement,
    #[display("--")]
    PreDecrement,
    #[display("++")]
    PostIncrement,
    #[display("--")]
    PostDecrement,
}

impl UnaryOp {
    /// Operator for `symbol` in prefix or postfix position.
    pub fn from_symbol(symbol: &str, prefix: bool) -> Option<Self> {
        Some(match (symbol, prefix) {
            ("+", true) => UnaryOp::Plus,
            ("-", true) => UnaryOp::Minus,
            ("!", true) => UnaryOp::Not,
            ("~", true) => UnaryOp::BitNot,
            ("++", true) => UnaryOp::PreIncrement,
            ("--", true) => UnaryOp::PreDecrement,
            ("++", false) => UnaryOp::PostIncrement,
            ("--", false) => UnaryOp::PostDecrement,
            _ => return None,
        })
    }

    pub fn is_step(self) -> bool {
        matches!(
            self,
            UnaryOp::PreIncrement
                | UnaryOp::PreDecrement
                | UnaryOp::PostIncrement
                | UnaryOp::PostDecrement
        )
    }
}

/// What a child slot may hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum Slot {
    #[display("an expression")]
    Expression,
    /// Left side of an assignment or loop variable.
    #[display("an assignment target")]
    Target,
    #[display("a statement")]
    Statement,
    #[display("a type")]
    Type,
    #[display("a declaration")]
    Declaration,
    #[display("a block")]
    Block,
    /// Member of an anonymous class body.
    #[display("a class member")]
    Member,
}

impl Slot {
    pub fn accepts(self, node: &Node) -> bool {
        match self {
            Slot::Expression => node.kind.is_expression(),
            Slot::Target => matches!(
                node.kind,
                NodeKind::Identifier(_)
                    | NodeKind::FieldAccess { .. }
                    | NodeKind::ArrayIndex { .. }
                    | NodeKind::Declaration(_)
            ),
            Slot::Statement => !matches!(node.kind, NodeKind::Type(_)),
            Slot::Type => matches!(node.kind, NodeKind::Type(_)),
            Slot::Declaration => matches!(node.kind, NodeKind::Declaration(_)),
            Slot::Block => matches!(node.kind, NodeKind::Block(_)),
            Slot::Member => node.kind.is_member(),
        }
    }
}

impl NodeKind {
    /// Human-readable name used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::NoOp => "no-op",
            NodeKind::Literal(_) => "literal",
            NodeKind::Identifier(_) => "identifier",
            NodeKind::Keyword(_) => "keyword",
            NodeKind::Type(_) => "type",
            NodeKind::ArrayIndex { .. } => "array index",
            NodeKind::ArrayInit { .. } => "array initializer",
            NodeKind::Assign { .. } => "assignment",
            NodeKind::Binary { .. } => "binary operator",
            NodeKind::Unary { .. } => "unary operator",
            NodeKind::Cast { .. } => "cast",
            NodeKind::Conditional { .. } => "conditional",
            NodeKind::New { .. } => "constructor",
            NodeKind::NewArray { .. } => "array creation",
            NodeKind::Declaration(_) => "declaration",
            NodeKind::DeclarationList(_) => "declaration list",
            NodeKind::Drop { .. } => "drop",
            NodeKind::ForEach { .. } => "enhanced for",
            NodeKind::For { .. } => "for",
            NodeKind::While { .. } => "while",
            NodeKind::DoWhile { .. } => "do",
            NodeKind::If { .. } => "if",
            NodeKind::Function(_) => "function declaration",
            NodeKind::FieldAccess { .. } => "field access",
            NodeKind::MethodCall { .. } => "method call",
            NodeKind::Import(_) => "import",
            NodeKind::InstanceOf { .. } => "instanceof",
            NodeKind::Block(_) => "block",
            NodeKind::Switch { .. } => "switch",
            NodeKind::Synchronized { .. } => "synchronized",
            NodeKind::Throw(_) => "throw",
            NodeKind::Return(_) => "return",
            NodeKind::Try { .. } => "try",
            NodeKind::ClassLiteral(_) => "class literal",
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::Literal(_)
                | NodeKind::Identifier(_)
                | NodeKind::Keyword(Keyword::This)
                | NodeKind::ArrayIndex { .. }
                | NodeKind::ArrayInit { .. }
                | NodeKind::Assign { .. }
                | NodeKind::Binary { .. }
                | NodeKind::Unary { .. }
                | NodeKind::Cast { .. }
                | NodeKind::Conditional { .. }
                | NodeKind::New { .. }
                | NodeKind::NewArray { .. }
                | NodeKind::FieldAccess { .. }
                | NodeKind::MethodCall { .. }
                | NodeKind::InstanceOf { .. }
                | NodeKind::ClassLiteral(_)
        )
    }

    /// Allowed inside an anonymous class body.
    pub fn is_member(&self) -> bool {
        match self {
            NodeKind::Function(_) | NodeKind::Declaration(_) | NodeKind::NoOp => true,
            NodeKind::DeclarationList(items) => items.iter().all(|item| item.kind.is_member()),
            NodeKind::Assign {
                op: AssignOp::Assign,
                target,
                ..
            } => matches!(target.kind, NodeKind::Declaration(_)),
            _ => false,
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { span, kind }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    /// Immediate children in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        self.slots().into_iter().map(|(_, node)| node).collect()
    }

    /// Replace the child at `index` (as numbered by [`Node::children`]),
    /// returning the old child.
    pub fn replace(&mut self, index: usize, new: Node) -> Result<Node, EditError> {
        let kind = self.label();
        let slots = self.slots_mut();
        if slots.is_empty() {
            return Err(EditError::InvalidTarget { kind });
        }
        let (slot, target) = slots
            .into_iter()
            .nth(index)
            .ok_or(EditError::IndexOutOfRange { kind, index })?;
        if !slot.accepts(&new) {
            return Err(EditError::IncompatibleKind {
                slot,
                found: new.label(),
            });
        }
        Ok(std::mem::replace(target, new))
    }

    /// Children with the slot each one occupies.
    pub fn slots(&self) -> Vec<(Slot, &Node)> {
        use Slot::*;
        let mut out = Vec::new();
        match &self.kind {
            NodeKind::NoOp
            | NodeKind::Literal(_)
            | NodeKind::Identifier(_)
            | NodeKind::Keyword(_)
            | NodeKind::Type(_)
            | NodeKind::Declaration(_)
            | NodeKind::Drop { .. }
            | NodeKind::Import(_) => {}
            NodeKind::ArrayIndex { array, index } => {
                out.push((Expression, &**array));
                out.push((Expression, &**index));
            }
            NodeKind::ArrayInit { items, .. } => {
                out.extend(items.iter().map(|n| (Expression, n)));
            }
            NodeKind::Assign { target, value, .. } => {
                out.push((Target, &**target));
                out.push((Expression, &**value));
            }
            NodeKind::Binary { left, right, .. } => {
                out.push((Expression, &**left));
                out.push((Expression, &**right));
            }
            NodeKind::Unary { operand, .. } => out.push((Expression, &**operand)),
            NodeKind::Cast { ty, operand } => {
                out.push((Type, &**ty));
                out.push((Expression, &**operand));
            }
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                out.push((Expression, &**cond));
                out.push((Expression, &**then));
                out.push((Expression, &**otherwise));
            }
            NodeKind::New { args, body, .. } => {
                out.extend(args.iter().map(|n| (Expression, n)));
                if let Some(members) = body {
                    out.extend(members.iter().map(|n| (Member, n)));
                }
            }
            NodeKind::NewArray { sizes, init, .. } => {
                out.extend(sizes.iter().map(|n| (Expression, n)));
                if let Some(init) = init {
                    out.push((Expression, &**init));
                }
            }
            NodeKind::DeclarationList(items) | NodeKind::Block(items) => {
                out.extend(items.iter().map(|n| (Statement, n)));
            }
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                out.push((Declaration, &**variable));
                out.push((Expression, &**iterable));
                out.push((Statement, &**body));
            }
            NodeKind::For {
                init,
                cond,
                update,
                body,
            } => {
                out.extend(init.iter().map(|n| (Statement, n)));
                if let Some(cond) = cond {
                    out.push((Expression, &**cond));
                }
                out.extend(update.iter().map(|n| (Expression, n)));
                out.push((Statement, &**body));
            }
            NodeKind::While { cond, body } => {
                out.push((Expression, &**cond));
                out.push((Statement, &**body));
            }
            NodeKind::DoWhile { body, cond } => {
                out.push((Statement, &**body));
                out.push((Expression, &**cond));
            }
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                out.push((Expression, &**cond));
                out.push((Statement, &**then));
                if let Some(otherwise) = otherwise {
                    out.push((Statement, &**otherwise));
                }
            }
            NodeKind::Function(function) => out.push((Block, &function.body)),
            NodeKind::FieldAccess { target, .. } => out.push((Expression, &**target)),
            NodeKind::MethodCall { target, args, .. } => {
                if let Some(target) = target {
                    out.push((Expression, &**target));
                }
                out.extend(args.iter().map(|n| (Expression, n)));
            }
            NodeKind::InstanceOf { operand, ty } => {
                out.push((Expression, &**operand));
                out.push((Type, &**ty));
            }
            NodeKind::Switch { value, cases } => {
                out.push((Expression, &**value));
                for case in cases {
                    if let Some(label) = &case.label {
                        out.push((Expression, label));
                    }
                    out.extend(case.body.iter().map(|n| (Statement, n)));
                }
            }
            NodeKind::Synchronized { lock, body } => {
                out.push((Expression, &**lock));
                out.push((Block, &**body));
            }
            NodeKind::Throw(value) => out.push((Expression, &**value)),
            NodeKind::Return(value) => {
                if let Some(value) = value {
                    out.push((Expression, &**value));
                }
            }
            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                out.push((Block, &**body));
                out.extend(catches.iter().map(|c| (Block, &c.body)));
                if let Some(finally) = finally {
                    out.push((Block, &**finally));
                }
            }
            NodeKind::ClassLiteral(ty) => out.push((Type, &**ty)),
        }
        out
    }

    fn slots_mut(&mut self) -> Vec<(Slot, &mut Node)> {
        use Slot::*;
        let mut out = Vec::new();
        match &mut self.kind {
            NodeKind::NoOp
            | NodeKind::Literal(_)
            | NodeKind::Identifier(_)
            | NodeKind::Keyword(_)
            | NodeKind::Type(_)
            | NodeKind::Declaration(_)
            | NodeKind::Drop { .. }
            | NodeKind::Import(_) => {}
            NodeKind::ArrayIndex { array, index } => {
                out.push((Expression, &mut **array));
                out.push((Expression, &mut **index));
            }
            NodeKind::ArrayInit { items, .. } => {
                out.extend(items.iter_mut().map(|n| (Expression, n)));
            }
            NodeKind::Assign { target, value, .. } => {
                out.push((Target, &mut **target));
                out.push((Expression, &mut **value));
            }
            NodeKind::Binary { left, right, .. } => {
                out.push((Expression, &mut **left));
                out.push((Expression, &mut **right));
            }
            NodeKind::Unary { operand, .. } => out.push((Expression, &mut **operand)),
            NodeKind::Cast { ty, operand } => {
                out.push((Type, &mut **ty));
                out.push((Expression, &mut **operand));
            }
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                out.push((Expression, &mut **cond));
                out.push((Expression, &mut **then));
                out.push((Expression, &mut **otherwise));
            }
            NodeKind::New { args, body, .. } => {
                out.extend(args.iter_mut().map(|n| (Expression, n)));
                if let Some(members) = body {
                    out.extend(members.iter_mut().map(|n| (Member, n)));
                }
            }
            NodeKind::NewArray { sizes, init, .. } => {
                out.extend(sizes.iter_mut().map(|n| (Expression, n)));
                if let Some(init) = init {
                    out.push((Expression, &mut **init));
                }
            }
            NodeKind::DeclarationList(items) | NodeKind::Block(items) => {
                out.extend(items.iter_mut().map(|n| (Statement, n)));
            }
            NodeKind::ForEach {
                variable,
                iterable,
                body,
            } => {
                out.push((Declaration, &mut **variable));
                out.push((Expression, &mut **iterable));
                out.push((Statement, &mut **body));
            }
            NodeKind::For {
                init,
                cond,
                update,
                body,
            } => {
                out.extend(init.iter_mut().map(|n| (Statement, n)));
                if let Some(cond) = cond {
                    out.push((Expression, &mut **cond));
                }
                out.extend(update.iter_mut().map(|n| (Expression, n)));
                out.push((Statement, &mut **body));
            }
            NodeKind::While { cond, body } => {
                out.push((Expression, &mut **cond));
                out.push((Statement, &mut **body));
            }
            NodeKind::DoWhile { body, cond } => {
                out.push((Statement, &mut **body));
                out.push((Expression, &mut **cond));
            }
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                out.push((Expression, &mut **cond));
                out.push((Statement, &mut **then));
                if let Some(otherwise) = otherwise {
                    out.push((Statement, &mut **otherwise));
                }
            }
            NodeKind::Function(function) => out.push((Block, &mut Rc::make_mut(function).body)),
            NodeKind::FieldAccess { target, .. } => out.push((Expression, &mut **target)),
            NodeKind::MethodCall { target, args, .. } => {
                if let Some(target) = target {
                    out.push((Expression, &mut **target));
                }
                out.extend(args.iter_mut().map(|n| (Expression, n)));
            }
            NodeKind::InstanceOf { operand, ty } => {
                out.push((Expression, &mut **operand));
                out.push((Type, &mut **ty));
            }
            NodeKind::Switch { value, cases } => {
                out.push((Expression, &mut **value));
                for case in cases {
                    if let Some(label) = &mut case.label {
                        out.push((Expression, label));
                    }
                    out.extend(case.body.iter_mut().map(|n| (Statement, n)));
                }
            }
            NodeKind::Synchronized { lock, body } => {
                out.push((Expression, &mut **lock));
                out.push((Block, &mut **body));
            }
            NodeKind::Throw(value) => out.push((Expression, &mut **value)),
            NodeKind::Return(value) => {
                if let Some(value) = value {
                    out.push((Expression, &mut **value));
                }
            }
            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                out.push((Block, &mut **body));
                out.extend(catches.iter_mut().map(|c| (Block, &mut c.body)));
                if let Some(finally) = finally {
                    out.push((Block, &mut **finally));
                }
            }
            NodeKind::ClassLiteral(ty) => out.push((Type, &mut **ty)),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str, at: usize) -> Node {
        Node::new(
            NodeKind::Identifier(name.into()),
            Span::new(at, at + name.len()),
        )
    }

    fn int(value: i32) -> Node {
        Node::new(NodeKind::Literal(Literal::Int(value)), Span::new(0, 1))
    }

    #[test]
    fn leaves_reject_replacement() {
        let mut leaf = ident("x", 0);
        assert!(leaf.children().is_empty());
        assert_eq!(
            leaf.replace(0, int(1)),
            Err(EditError::InvalidTarget { kind: "identifier" })
        );
    }

    #[test]
    fn replace_checks_slot_kind() {
        let mut assign = Node::new(
            NodeKind::Assign {
                op: AssignOp::Assign,
                target: Box::new(ident("x", 0)),
                value: Box::new(int(1)),
            },
            Span::new(0, 5),
        );
        let err = assign.replace(0, int(2)).unwrap_err();
        assert!(matches!(
            err,
            EditError::IncompatibleKind {
                slot: Slot::Target,
                ..
            }
        ));

        let old = assign.replace(1, ident("y", 4)).unwrap();
        assert_eq!(old, int(1));
        assert_eq!(assign.children()[1], &ident("y", 4));
        assert!(matches!(
            assign.replace(2, int(3)),
            Err(EditError::IndexOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn children_follow_evaluation_order() {
        let call = Node::new(
            NodeKind::MethodCall {
                target: Some(Box::new(ident("a", 0))),
                type_args: Vec::new(),
                name: "f".into(),
                args: vec![int(1), ident("b", 6)],
            },
            Span::new(0, 8),
        );
        let labels: Vec<_> = call.children().iter().map(|c| c.label()).collect();
        assert_eq!(labels, ["identifier", "literal", "identifier"]);
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            AssignOp::from_symbol(">>>="),
            Some(AssignOp::Compound(BinaryOp::UShr))
        );
        assert_eq!(AssignOp::from_symbol("=="), None);
        assert_eq!(AssignOp::from_symbol("<="), None);
        assert_eq!(AssignOp::Compound(BinaryOp::Add).to_string(), "+=");
    }
}
