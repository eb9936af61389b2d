//! The construction pass: binds a raw [`ParseMatch`] tree into [`Node`]s.
//!
//! Besides shaping the tree, this pass re-associates flat operator lists,
//! decides prefix vs. postfix for unary operators from match offsets, and
//! rejects structurally invalid programs before anything is evaluated.

use std::rc::Rc;

use kava_core::Primitive;
use kava_syntax::ParseMatch;

use crate::error::{ConstructionError, ConstructionErrorKind, ConstructionResult, LiteralError};
use crate::function::{FunctionDecl, Param};
use crate::literal::Literal;
use crate::node::{
    AssignOp, BinaryOp, CatchClause, Declaration, Import, Keyword, Node, NodeKind, SwitchCase,
    UnaryOp,
};
use crate::type_ref::{TypeName, TypeRef};

/// Bind every top-level construct of a `program` match.
pub fn construct_program(source: &str, program: &ParseMatch) -> ConstructionResult<Vec<Node>> {
    let builder = Builder { source };
    let nodes = program
        .children
        .iter()
        .map(|m| builder.statement(m))
        .collect::<ConstructionResult<Vec<_>>>()?;
    tracing::debug!(constructs = nodes.len(), "constructed program");
    Ok(nodes)
}

/// Bind a single statement, declaration or expression match.
pub fn construct(source: &str, m: &ParseMatch) -> ConstructionResult<Node> {
    Builder { source }.statement(m)
}

struct Builder<'s> {
    source: &'s str,
}

fn unexpected(m: &ParseMatch) -> ConstructionError {
    ConstructionError::new(ConstructionErrorKind::UnexpectedMatch(m.kind.clone()), m.span)
}

fn child_at<'m>(m: &'m ParseMatch, index: usize) -> ConstructionResult<&'m ParseMatch> {
    m.children
        .get(index)
        .ok_or_else(|| ConstructionError::malformed(m.kind.replace('_', " "), m.span))
}

fn boxed(node: Node) -> Box<Node> {
    Box::new(node)
}

impl Builder<'_> {
    fn text(&self, m: &ParseMatch) -> &str {
        m.text(self.source)
    }

    fn literal(&self, m: &ParseMatch, parse: fn(&str) -> Result<Literal, LiteralError>) -> ConstructionResult<Node> {
        let literal = parse(self.text(m))
            .map_err(|e| ConstructionError::new(ConstructionErrorKind::Literal(e), m.span))?;
        Ok(Node::new(NodeKind::Literal(literal), m.span))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&self, m: &ParseMatch) -> ConstructionResult<Node> {
        let kind = match m.kind.as_str() {
            "comment" | "empty_statement" => NodeKind::NoOp,
            "block" => NodeKind::Block(self.statements(&m.children)?),
            "local_declaration" => return self.local_declaration(m),
            "expression_statement" => return self.expression(child_at(m, 0)?),
            "if_statement" => NodeKind::If {
                cond: boxed(self.expression(child_at(m, 0)?)?),
                then: boxed(self.statement(child_at(m, 1)?)?),
                otherwise: m
                    .children
                    .get(2)
                    .map(|e| self.statement(e).map(boxed))
                    .transpose()?,
            },
            "while_statement" => NodeKind::While {
                cond: boxed(self.expression(child_at(m, 0)?)?),
                body: boxed(self.statement(child_at(m, 1)?)?),
            },
            "do_statement" => NodeKind::DoWhile {
                body: boxed(self.statement(child_at(m, 0)?)?),
                cond: boxed(self.expression(child_at(m, 1)?)?),
            },
            "for_statement" => self.for_statement(m)?,
            "enhanced_for_statement" => self.enhanced_for(m)?,
            "switch_statement" => self.switch_statement(m)?,
            "synchronized_statement" => NodeKind::Synchronized {
                lock: boxed(self.expression(child_at(m, 0)?)?),
                body: boxed(self.statement(child_at(m, 1)?)?),
            },
            "throw_statement" => NodeKind::Throw(boxed(self.expression(child_at(m, 0)?)?)),
            "return_statement" => NodeKind::Return(
                m.children
                    .first()
                    .map(|e| self.expression(e).map(boxed))
                    .transpose()?,
            ),
            "break_statement" => NodeKind::Keyword(Keyword::Break),
            "continue_statement" => NodeKind::Keyword(Keyword::Continue),
            "try_statement" => self.try_statement(m)?,
            "import_declaration" => NodeKind::Import(self.import(m)?),
            "drop_statement" => self.drop_statement(m)?,
            "function_declaration" => NodeKind::Function(Rc::new(self.function(m)?)),
            _ => return self.expression(m),
        };
        Ok(Node::new(kind, m.span))
    }

    fn statements(&self, matches: &[ParseMatch]) -> ConstructionResult<Vec<Node>> {
        matches.iter().map(|m| self.statement(m)).collect()
    }

    fn local_declaration(&self, m: &ParseMatch) -> ConstructionResult<Node> {
        let is_final = m
            .child("modifiers")
            .is_some_and(|mods| mods.child("final").is_some());
        let base = self.type_ref(m.child("type").ok_or_else(|| unexpected(m))?)?;
        let mut nodes = m
            .children_of("declarator")
            .map(|d| self.declarator(d, &base, is_final))
            .collect::<ConstructionResult<Vec<_>>>()?;
        match nodes.len() {
            0 => Err(ConstructionError::malformed("declaration", m.span)),
            1 => {
                let mut node = nodes.remove(0);
                node.span = m.span;
                Ok(node)
            }
            _ => Ok(Node::new(NodeKind::DeclarationList(nodes), m.span)),
        }
    }

    fn declarator(&self, m: &ParseMatch, base: &TypeRef, is_final: bool) -> ConstructionResult<Node> {
        let name = self.text(child_at(m, 0)?).to_string();
        let extra = m.child("dims").map_or(0, |d| d.children.len() as u32);
        let ty = base.clone().with_dims(extra);
        let init = m
            .children
            .iter()
            .skip(1)
            .find(|c| !c.is("dims"))
            .map(|init| self.initializer(init, &ty))
            .transpose()?;
        let declaration = Node::new(
            NodeKind::Declaration(Declaration { ty, name, is_final }),
            m.span,
        );
        Ok(match init {
            Some(value) => Node::new(
                NodeKind::Assign {
                    op: AssignOp::Assign,
                    target: boxed(declaration),
                    value: boxed(value),
                },
                m.span,
            ),
            None => declaration,
        })
    }

    /// An initializer for a variable of type `ty`; bare `{...}` takes its
    /// type from the variable.
    fn initializer(&self, m: &ParseMatch, ty: &TypeRef) -> ConstructionResult<Node> {
        if m.is("array_initializer") {
            self.array_initializer(m, Some(ty.clone()))
        } else {
            self.expression(m)
        }
    }

    fn array_initializer(&self, m: &ParseMatch, ty: Option<TypeRef>) -> ConstructionResult<Node> {
        let component = match &ty {
            Some(ty) => Some(ty.component().ok_or_else(|| {
                ConstructionError::new(
                    ConstructionErrorKind::InitializerForNonArray(ty.to_string()),
                    m.span,
                )
            })?),
            None => None,
        };
        let items = m
            .children
            .iter()
            .map(|item| match (&component, item.is("array_initializer")) {
                (Some(component), _) => self.initializer(item, component),
                (None, true) => self.array_initializer(item, None),
                (None, false) => self.expression(item),
            })
            .collect::<ConstructionResult<Vec<_>>>()?;
        Ok(Node::new(NodeKind::ArrayInit { ty, items }, m.span))
    }

    fn for_statement(&self, m: &ParseMatch) -> ConstructionResult<NodeKind> {
        let init = child_at(m, 0)?
            .children
            .iter()
            .map(|c| self.statement(c))
            .collect::<ConstructionResult<Vec<_>>>()?;
        let cond = child_at(m, 1)?
            .children
            .first()
            .map(|c| self.expression(c).map(boxed))
            .transpose()?;
        let update = child_at(m, 2)?
            .children
            .iter()
            .map(|c| self.expression(c))
            .collect::<ConstructionResult<Vec<_>>>()?;
        let body = boxed(self.statement(child_at(m, 3)?)?);
        Ok(NodeKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn enhanced_for(&self, m: &ParseMatch) -> ConstructionResult<NodeKind> {
        let variable = child_at(m, 0)?;
        let is_final = variable.child("final").is_some();
        let ty = self.type_ref(variable.child("type").ok_or_else(|| unexpected(variable))?)?;
        let name = variable
            .child("identifier")
            .ok_or_else(|| unexpected(variable))?;
        let declaration = Node::new(
            NodeKind::Declaration(Declaration {
                ty,
                name: self.text(name).to_string(),
                is_final,
            }),
            variable.span,
        );
        Ok(NodeKind::ForEach {
            variable: boxed(declaration),
            iterable: boxed(self.expression(child_at(m, 1)?)?),
            body: boxed(self.statement(child_at(m, 2)?)?),
        })
    }

    fn switch_statement(&self, m: &ParseMatch) -> ConstructionResult<NodeKind> {
        let value = boxed(self.expression(child_at(m, 0)?)?);
        let mut cases: Vec<SwitchCase> = Vec::new();
        let mut seen_default = false;
        for entry in &child_at(m, 1)?.children {
            if entry.is("switch_label") {
                let label = child_at(entry, 0)?;
                let label = if label.is("default") {
                    if seen_default {
                        return Err(ConstructionError::new(
                            ConstructionErrorKind::DuplicateDefault,
                            entry.span,
                        ));
                    }
                    seen_default = true;
                    None
                } else {
                    Some(self.expression(label)?)
                };
                cases.push(SwitchCase {
                    label,
                    body: Vec::new(),
                    span: entry.span,
                });
                continue;
            }
            let statement = self.statement(entry)?;
            match cases.last_mut() {
                Some(case) => {
                    case.span = case.span.to(statement.span);
                    case.body.push(statement);
                }
                None if matches!(statement.kind, NodeKind::NoOp) => {}
                None => {
                    return Err(ConstructionError::new(
                        ConstructionErrorKind::UnlabelledSwitchStatement,
                        entry.span,
                    ));
                }
            }
        }
        Ok(NodeKind::Switch { value, cases })
    }

    fn try_statement(&self, m: &ParseMatch) -> ConstructionResult<NodeKind> {
        let body = boxed(self.statement(child_at(m, 0)?)?);
        let mut catches = Vec::new();
        for clause in m.children_of("catch_clause") {
            let types = child_at(clause, 0)?
                .children
                .iter()
                .map(|t| self.type_ref(t))
                .collect::<ConstructionResult<Vec<_>>>()?;
            catches.push(CatchClause {
                types,
                name: self.text(child_at(clause, 1)?).to_string(),
                body: self.statement(child_at(clause, 2)?)?,
                span: clause.span,
            });
        }
        let finally = m
            .child("finally_clause")
            .map(|f| self.statement(child_at(f, 0)?).map(boxed))
            .transpose()?;
        if catches.is_empty() && finally.is_none() {
            return Err(ConstructionError::new(ConstructionErrorKind::BareTry, m.span));
        }
        Ok(NodeKind::Try {
            body,
            catches,
            finally,
        })
    }

    fn import(&self, m: &ParseMatch) -> ConstructionResult<Import> {
        let is_static = m.child("static").is_some();
        let on_demand = m.child("asterisk").is_some();
        let name = m
            .child("qualified_name")
            .ok_or_else(|| unexpected(m))?
            .children
            .iter()
            .map(|segment| self.text(segment))
            .collect::<Vec<_>>()
            .join(".");
        Ok(match (is_static, on_demand) {
            (false, false) => Import::Class(name),
            (false, true) => Import::Package(name),
            (true, true) => Import::Static { owner: name },
            (true, false) => {
                let (owner, member) = name
                    .rsplit_once('.')
                    .ok_or_else(|| ConstructionError::malformed("static import", m.span))?;
                Import::StaticMember {
                    owner: owner.to_string(),
                    member: member.to_string(),
                }
            }
        })
    }

    fn drop_statement(&self, m: &ParseMatch) -> ConstructionResult<NodeKind> {
        let name = self.text(child_at(m, 0)?).to_string();
        let params = m
            .child("formal_types")
            .map(|types| {
                types
                    .children
                    .iter()
                    .map(|t| self.type_ref(t))
                    .collect::<ConstructionResult<Vec<_>>>()
            })
            .transpose()?;
        Ok(NodeKind::Drop { name, params })
    }

    fn function(&self, m: &ParseMatch) -> ConstructionResult<FunctionDecl> {
        let ret = self.type_ref(m.child("type").ok_or_else(|| unexpected(m))?)?;
        let name = self
            .text(m.child("identifier").ok_or_else(|| unexpected(m))?)
            .to_string();
        let formals = m.child("formal_parameters").ok_or_else(|| unexpected(m))?;
        let count = formals.children.len();
        let mut params = Vec::with_capacity(count);
        for (i, formal) in formals.children.iter().enumerate() {
            let varargs = formal.child("varargs").is_some();
            if varargs && i + 1 != count {
                return Err(ConstructionError::new(
                    ConstructionErrorKind::MisplacedVarargs,
                    formal.span,
                ));
            }
            let extra = formal.child("dims").map_or(0, |d| d.children.len() as u32);
            let ty = self
                .type_ref(formal.child("type").ok_or_else(|| unexpected(formal))?)?
                .with_dims(extra + u32::from(varargs));
            params.push(Param {
                name: self
                    .text(formal.child("identifier").ok_or_else(|| unexpected(formal))?)
                    .to_string(),
                ty,
                is_final: formal.child("final").is_some(),
                varargs,
            });
        }
        let throws = match m.child("throws") {
            Some(throws) => throws
                .children
                .iter()
                .map(|t| self.type_ref(t))
                .collect::<ConstructionResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        let body = self.statement(m.child("block").ok_or_else(|| unexpected(m))?)?;
        Ok(FunctionDecl {
            name,
            params,
            ret,
            throws,
            body,
            span: m.span,
        })
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn type_ref(&self, m: &ParseMatch) -> ConstructionResult<TypeRef> {
        match m.kind.as_str() {
            "type" => {
                let base = self.type_ref(child_at(m, 0)?)?;
                let dims = m.child("dims").map_or(0, |d| d.children.len() as u32);
                Ok(TypeRef {
                    span: m.span,
                    ..base.with_dims(dims)
                })
            }
            "primitive_type" => {
                let primitive = Primitive::from_name(self.text(m)).ok_or_else(|| unexpected(m))?;
                Ok(TypeRef::primitive(primitive, m.span))
            }
            "class_type" => {
                let name = m
                    .children_of("identifier")
                    .map(|segment| self.text(segment))
                    .collect::<Vec<_>>()
                    .join(".");
                let args = match m.child("type_arguments") {
                    Some(args) => args
                        .children
                        .iter()
                        .map(|a| self.type_ref(a))
                        .collect::<ConstructionResult<Vec<_>>>()?,
                    None => Vec::new(),
                };
                Ok(TypeRef {
                    args,
                    ..TypeRef::named(name, m.span)
                })
            }
            "wildcard" => {
                let bound = m
                    .child("type")
                    .map(|b| self.type_ref(b).map(Box::new))
                    .transpose()?;
                Ok(TypeRef {
                    name: TypeName::Wildcard {
                        bound,
                        upper: m.child("super").is_none(),
                    },
                    args: Vec::new(),
                    dims: 0,
                    span: m.span,
                })
            }
            _ => Err(unexpected(m)),
        }
    }

    fn type_node(&self, m: &ParseMatch) -> ConstructionResult<Node> {
        Ok(Node::new(NodeKind::Type(self.type_ref(m)?), m.span))
    }

    /// A dotted name written as an expression (`java.util.List` in
    /// `java.util.List[].class`) read back as a type name.
    fn dotted_name(&self, m: &ParseMatch) -> ConstructionResult<String> {
        match m.kind.as_str() {
            "identifier" => Ok(self.text(m).to_string()),
            "field_access" => Ok(format!(
                "{}.{}",
                self.dotted_name(child_at(m, 0)?)?,
                self.text(child_at(m, 1)?)
            )),
            _ => Err(unexpected(m)),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&self, m: &ParseMatch) -> ConstructionResult<Node> {
        let kind = match m.kind.as_str() {
            "number_literal" => return self.literal(m, Literal::parse_number),
            "string_literal" => return self.literal(m, Literal::parse_string),
            "char_literal" => return self.literal(m, Literal::parse_char),
            "boolean_literal" => return self.literal(m, Literal::parse_boolean),
            "null_literal" => NodeKind::Literal(Literal::Null),
            "identifier" => NodeKind::Identifier(self.text(m).to_string()),
            "this" => NodeKind::Keyword(Keyword::This),
            "parenthesized" => return self.expression(child_at(m, 0)?),
            "assignment" => {
                let op_match = child_at(m, 1)?;
                let op = AssignOp::from_symbol(self.text(op_match))
                    .ok_or_else(|| unexpected(op_match))?;
                NodeKind::Assign {
                    op,
                    target: boxed(self.expression(child_at(m, 0)?)?),
                    value: boxed(self.expression(child_at(m, 2)?)?),
                }
            }
            "conditional" => NodeKind::Conditional {
                cond: boxed(self.expression(child_at(m, 0)?)?),
                then: boxed(self.expression(child_at(m, 1)?)?),
                otherwise: boxed(self.expression(child_at(m, 2)?)?),
            },
            "binary" => return self.binary(m),
            "instanceof_expression" => NodeKind::InstanceOf {
                operand: boxed(self.expression(child_at(m, 0)?)?),
                ty: boxed(self.type_node(child_at(m, 1)?)?),
            },
            "unary" => return self.unary(m),
            "cast_expression" => NodeKind::Cast {
                ty: boxed(self.type_node(child_at(m, 0)?)?),
                operand: boxed(self.expression(child_at(m, 1)?)?),
            },
            "field_access" => NodeKind::FieldAccess {
                target: boxed(self.expression(child_at(m, 0)?)?),
                name: self.text(child_at(m, 1)?).to_string(),
            },
            "method_invocation" => self.method_invocation(m)?,
            "array_access" => NodeKind::ArrayIndex {
                array: boxed(self.expression(child_at(m, 0)?)?),
                index: boxed(self.expression(child_at(m, 1)?)?),
            },
            "object_creation" => self.object_creation(m)?,
            "array_creation" => self.array_creation(m)?,
            "array_initializer" => return self.array_initializer(m, None),
            "class_literal" => {
                let first = child_at(m, 0)?;
                let ty = if first.is("type") {
                    self.type_ref(first)?
                } else {
                    let dims = m.child("dims").map_or(0, |d| d.children.len() as u32);
                    TypeRef::named(self.dotted_name(first)?, m.span).with_dims(dims)
                };
                NodeKind::ClassLiteral(boxed(Node::new(NodeKind::Type(ty), first.span)))
            }
            _ => return Err(unexpected(m)),
        };
        Ok(Node::new(kind, m.span))
    }

    /// Fold a flat `[operand, operator, operand, ...]` list left to right.
    fn binary(&self, m: &ParseMatch) -> ConstructionResult<Node> {
        let mut parts = m.children.iter();
        let first = parts.next().ok_or_else(|| unexpected(m))?;
        let mut acc = self.expression(first)?;
        while let Some(op_match) = parts.next() {
            let op = BinaryOp::from_symbol(self.text(op_match)).ok_or_else(|| unexpected(op_match))?;
            let right_match = parts
                .next()
                .ok_or_else(|| ConstructionError::malformed("binary expression", m.span))?;
            let right = self.expression(right_match)?;
            let span = acc.span.to(right.span);
            acc = Node::new(
                NodeKind::Binary {
                    op,
                    left: boxed(acc),
                    right: boxed(right),
                },
                span,
            );
        }
        Ok(acc)
    }

    fn unary(&self, m: &ParseMatch) -> ConstructionResult<Node> {
        let (a, b) = (child_at(m, 0)?, child_at(m, 1)?);
        let (op_match, operand) = if a.is("operator") { (a, b) } else { (b, a) };
        let prefix = op_match.offset() < operand.offset();
        let symbol = self.text(op_match);

        if prefix && symbol == "-" && operand.is("number_literal") {
            let text = format!("-{}", self.text(operand));
            let literal = Literal::parse_number(&text)
                .map_err(|e| ConstructionError::new(ConstructionErrorKind::Literal(e), m.span))?;
            return Ok(Node::new(NodeKind::Literal(literal), m.span));
        }

        let op = UnaryOp::from_symbol(symbol, prefix).ok_or_else(|| unexpected(op_match))?;
        Ok(Node::new(
            NodeKind::Unary {
                op,
                operand: boxed(self.expression(operand)?),
            },
            m.span,
        ))
    }

    fn arguments(&self, m: &ParseMatch) -> ConstructionResult<Vec<Node>> {
        m.children.iter().map(|a| self.expression(a)).collect()
    }

    fn method_invocation(&self, m: &ParseMatch) -> ConstructionResult<NodeKind> {
        let args = self.arguments(m.child("arguments").ok_or_else(|| unexpected(m))?)?;
        let names: Vec<_> = m.children_of("identifier").collect();
        let (target, name) = match m.children.first() {
            Some(first) if m.children.len() == 2 && first.is("identifier") => (None, first),
            Some(first) => {
                let name = names.last().copied().ok_or_else(|| unexpected(m))?;
                (Some(boxed(self.expression(first)?)), name)
            }
            None => return Err(unexpected(m)),
        };
        let type_args = match m.child("type_arguments") {
            Some(args) => args
                .children
                .iter()
                .map(|a| self.type_ref(a))
                .collect::<ConstructionResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(NodeKind::MethodCall {
            target,
            type_args,
            name: self.text(name).to_string(),
            args,
        })
    }

    fn object_creation(&self, m: &ParseMatch) -> ConstructionResult<NodeKind> {
        let class = self.type_ref(child_at(m, 0)?)?;
        if class.args.iter().any(TypeRef::is_wildcard) {
            return Err(ConstructionError::new(
                ConstructionErrorKind::WildcardInstantiation(class.to_string()),
                class.span,
            ));
        }
        let args = self.arguments(m.child("arguments").ok_or_else(|| unexpected(m))?)?;
        let body = m
            .child("class_body")
            .map(|body| {
                body.children
                    .iter()
                    .map(|member| self.class_member(member))
                    .collect::<ConstructionResult<Vec<_>>>()
            })
            .transpose()?;
        Ok(NodeKind::New { class, args, body })
    }

    fn class_member(&self, m: &ParseMatch) -> ConstructionResult<Node> {
        let node = self.statement(m)?;
        if !node.kind.is_member() {
            return Err(ConstructionError::new(
                ConstructionErrorKind::InvalidClassMember,
                m.span,
            ));
        }
        Ok(node)
    }

    fn array_creation(&self, m: &ParseMatch) -> ConstructionResult<NodeKind> {
        let element = self.type_ref(child_at(m, 0)?)?;
        let sizes = m
            .children_of("dim_expr")
            .map(|d| self.expression(child_at(d, 0)?))
            .collect::<ConstructionResult<Vec<_>>>()?;
        let extra = m.child("dims").map_or(0, |d| d.children.len() as u32);
        let dims = sizes.len() as u32 + extra;
        let init = m
            .child("array_initializer")
            .map(|init| {
                self.array_initializer(init, Some(element.clone().with_dims(dims)))
                    .map(boxed)
            })
            .transpose()?;
        Ok(NodeKind::NewArray {
            element,
            sizes,
            dims,
            init,
        })
    }
}

