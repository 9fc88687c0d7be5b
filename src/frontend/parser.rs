// src/frontend/parser.rs

use std::collections::VecDeque;
use std::sync::Arc;

use crate::errors::{LexerError, ParserError};
use crate::frontend::ast::*;
use crate::frontend::{Interner, Lexer, NameId, Span, Token, TokenType};
use crate::value::LiteralBase;

/// A parse error wrapping a miette-enabled ParserError
#[derive(Debug)]
pub struct ParseError {
    pub error: ParserError,
    pub span: Span,
}

impl ParseError {
    pub fn new(error: ParserError, span: Span) -> Self {
        Self { error, span }
    }
}

pub struct Parser<'src, 'i> {
    lexer: Lexer<'src>,
    current: Token,
    lookahead: VecDeque<Token>,
    interner: &'i mut Interner,
}

impl<'src, 'i> Parser<'src, 'i> {
    pub fn new(source: &'src str, interner: &'i mut Interner) -> Self {
        Self::with_base(source, 0, interner)
    }

    /// Parse with spans offset into a compilation-wide coordinate space.
    pub fn with_base(source: &'src str, base: usize, interner: &'i mut Interner) -> Self {
        let mut lexer = Lexer::with_base(source, base);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            lookahead: VecDeque::new(),
            interner,
        }
    }

    /// Errors collected by the lexer while scanning.
    pub fn take_lexer_errors(&mut self) -> Vec<LexerError> {
        self.lexer.take_errors()
    }

    pub fn parse_unit(&mut self) -> Result<SourceUnit, ParseError> {
        let mut items = Vec::new();
        while !self.check(TokenType::Eof) {
            items.push(self.item()?);
        }
        Ok(SourceUnit { items })
    }

    /// Parse a standalone expression (used for parameter override values).
    pub fn parse_expression(&mut self) -> Result<ExprSyntax, ParseError> {
        self.expression()
    }

    fn item(&mut self) -> Result<Item, ParseError> {
        match self.current.ty {
            TokenType::KwModule | TokenType::KwMacroModule => {
                self.definition(DefinitionKind::Module, TokenType::KwEndModule)
            }
            TokenType::KwInterface => {
                self.definition(DefinitionKind::Interface, TokenType::KwEndInterface)
            }
            TokenType::KwProgram => {
                self.definition(DefinitionKind::Program, TokenType::KwEndProgram)
            }
            TokenType::KwPackage => self.package(),
            _ => Err(self.unexpected()),
        }
    }

    fn definition(
        &mut self,
        kind: DefinitionKind,
        end_token: TokenType,
    ) -> Result<Item, ParseError> {
        let start_span = self.current.span;
        self.advance(); // module/interface/program

        let (name, name_span) = self.identifier("definition name")?;

        let mut param_ports = Vec::new();
        if self.check(TokenType::Hash) {
            self.advance();
            self.consume(TokenType::LParen, "(")?;
            param_ports = self.param_port_list()?;
            self.consume(TokenType::RParen, ")")?;
        }

        let mut ports = Vec::new();
        if self.check(TokenType::LParen) {
            self.advance();
            if !self.check(TokenType::RParen) {
                ports = self.port_list()?;
            }
            self.consume(TokenType::RParen, ")")?;
        }
        self.consume(TokenType::Semicolon, ";")?;

        let mut items = Vec::new();
        while !self.check(end_token) && !self.check(TokenType::Eof) {
            items.push(self.module_item()?);
        }
        let end_span = self.current.span;
        self.consume(end_token, end_token.as_str())?;

        Ok(Item::Definition(Arc::new(DefinitionDecl {
            kind,
            name,
            name_span,
            param_ports,
            ports,
            items,
            span: start_span.merge(end_span),
        })))
    }

    fn package(&mut self) -> Result<Item, ParseError> {
        let start_span = self.current.span;
        self.advance(); // package
        let (name, name_span) = self.identifier("package name")?;
        self.consume(TokenType::Semicolon, ";")?;

        let mut items = Vec::new();
        while !self.check(TokenType::KwEndPackage) && !self.check(TokenType::Eof) {
            items.push(self.module_item()?);
        }
        let end_span = self.current.span;
        self.consume(TokenType::KwEndPackage, "endpackage")?;

        Ok(Item::Package(Arc::new(PackageDecl {
            name,
            name_span,
            items,
            span: start_span.merge(end_span),
        })))
    }

    fn param_port_list(&mut self) -> Result<Vec<ParamDecl>, ParseError> {
        let mut params = Vec::new();
        let mut is_local = false;
        loop {
            if self.check(TokenType::KwParameter) {
                self.advance();
                is_local = false;
            } else if self.check(TokenType::KwLocalParam) {
                self.advance();
                is_local = true;
            }
            params.push(self.param_assignment(is_local)?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        Ok(params)
    }

    // One `[type] name [= expr]` parameter assignment.
    fn param_assignment(&mut self, is_local: bool) -> Result<ParamDecl, ParseError> {
        let start_span = self.current.span;
        let ty = if self.at_data_type() && self.peek_is_data_type_prefix() {
            self.data_type()?
        } else {
            TypeSyntax::implicit(start_span)
        };
        let (name, name_span) = self.identifier("parameter name")?;
        let init = if self.match_token(TokenType::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        let span = start_span.merge(self.previous_span(name_span, init.as_ref()));
        Ok(ParamDecl {
            is_local,
            ty,
            name,
            name_span,
            init,
            span,
        })
    }

    fn previous_span(&self, name_span: Span, init: Option<&ExprSyntax>) -> Span {
        init.map(|e| e.span).unwrap_or(name_span)
    }

    fn port_list(&mut self) -> Result<Vec<PortDecl>, ParseError> {
        let mut ports = Vec::new();
        let mut direction = PortDirection::Inout;
        loop {
            let start_span = self.current.span;
            match self.current.ty {
                TokenType::KwInput => {
                    direction = PortDirection::Input;
                    self.advance();
                }
                TokenType::KwOutput => {
                    direction = PortDirection::Output;
                    self.advance();
                }
                TokenType::KwInout => {
                    direction = PortDirection::Inout;
                    self.advance();
                }
                _ => {}
            }
            let is_net = if self.check(TokenType::KwWire) {
                self.advance();
                true
            } else {
                false
            };
            let ty = if self.at_data_type() && self.peek_is_data_type_prefix() {
                self.data_type()?
            } else {
                TypeSyntax::implicit(self.current.span)
            };
            let (name, name_span) = self.identifier("port name")?;
            ports.push(PortDecl {
                direction,
                is_net,
                ty,
                name,
                name_span,
                span: start_span.merge(name_span),
            });
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        Ok(ports)
    }

    fn module_item(&mut self) -> Result<ModuleItem, ParseError> {
        match self.current.ty {
            TokenType::KwParameter => {
                let decl = self.param_decl(false)?;
                Ok(ModuleItem::Param(decl))
            }
            TokenType::KwLocalParam => {
                let decl = self.param_decl(true)?;
                Ok(ModuleItem::Param(decl))
            }
            TokenType::KwTypedef => self.typedef(),
            TokenType::KwGenvar => {
                let start_span = self.current.span;
                self.advance();
                let (name, name_span) = self.identifier("genvar name")?;
                self.consume(TokenType::Semicolon, ";")?;
                Ok(ModuleItem::Genvar(GenvarDecl {
                    name,
                    name_span,
                    span: start_span.merge(name_span),
                }))
            }
            TokenType::KwDefparam => self.defparam(),
            TokenType::KwGenerate => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(TokenType::KwEndGenerate) && !self.check(TokenType::Eof) {
                    items.push(self.module_item()?);
                }
                self.consume(TokenType::KwEndGenerate, "endgenerate")?;
                Ok(ModuleItem::GenerateRegion(items))
            }
            TokenType::KwFor => self.generate_for(),
            TokenType::KwIf => self.generate_if(),
            TokenType::KwWire => self.net_decl(),
            TokenType::KwAssign => {
                let start_span = self.current.span;
                self.advance();
                let target = self.expression()?;
                self.consume(TokenType::Eq, "=")?;
                let value = self.expression()?;
                let end = self.current.span;
                self.consume(TokenType::Semicolon, ";")?;
                Ok(ModuleItem::ContinuousAssign(ContinuousAssign {
                    target,
                    value,
                    span: start_span.merge(end),
                }))
            }
            TokenType::KwInitial
            | TokenType::KwAlways
            | TokenType::KwAlwaysComb
            | TokenType::KwAlwaysFF
            | TokenType::KwAlwaysLatch => self.procedural_block(),
            TokenType::KwFunction => self.function_decl(),
            TokenType::KwImport => self.import_decl(),
            TokenType::KwInput | TokenType::KwOutput | TokenType::KwInout => {
                // Non-ANSI port declarations re-declare directions in the body.
                Err(self.unexpected())
            }
            TokenType::Identifier => {
                // `name name (` is an instantiation or a typedef'd variable;
                // `name #(` is always an instantiation.
                if self.peek(0).ty == TokenType::Hash
                    || (self.peek(0).ty == TokenType::Identifier
                        && self.peek(1).ty == TokenType::LParen)
                {
                    self.instantiation()
                } else {
                    self.var_decl()
                }
            }
            _ if self.at_data_type() => self.var_decl(),
            _ => Err(self.unexpected()),
        }
    }

    fn param_decl(&mut self, is_local: bool) -> Result<ParamDecl, ParseError> {
        self.advance(); // parameter/localparam
        let decl = self.param_assignment(is_local)?;
        self.consume(TokenType::Semicolon, ";")?;
        Ok(decl)
    }

    fn typedef(&mut self) -> Result<ModuleItem, ParseError> {
        let start_span = self.current.span;
        self.advance(); // typedef
        let ty = self.data_type()?;
        let (name, name_span) = self.identifier("typedef name")?;
        self.consume(TokenType::Semicolon, ";")?;
        Ok(ModuleItem::Typedef(TypedefDecl {
            ty,
            name,
            name_span,
            span: start_span.merge(name_span),
        }))
    }

    fn defparam(&mut self) -> Result<ModuleItem, ParseError> {
        let start_span = self.current.span;
        self.advance(); // defparam
        let mut target = Vec::new();
        loop {
            let (name, span) = self.identifier("defparam target")?;
            target.push((name, span));
            if !self.match_token(TokenType::Dot) {
                break;
            }
        }
        self.consume(TokenType::Eq, "=")?;
        let value = self.expression()?;
        let end = self.current.span;
        self.consume(TokenType::Semicolon, ";")?;
        Ok(ModuleItem::Defparam(DefparamDecl {
            target,
            value,
            span: start_span.merge(end),
        }))
    }

    fn generate_for(&mut self) -> Result<ModuleItem, ParseError> {
        let start_span = self.current.span;
        self.advance(); // for
        self.consume(TokenType::LParen, "(")?;
        self.match_token(TokenType::KwGenvar);
        let (genvar, genvar_span) = self.identifier("genvar name")?;
        self.consume(TokenType::Eq, "=")?;
        let init = self.expression()?;
        self.consume(TokenType::Semicolon, ";")?;
        let cond = self.expression()?;
        self.consume(TokenType::Semicolon, ";")?;
        // The step is `genvar = expr`; only the value matters here.
        let (_, _) = self.identifier("genvar name")?;
        self.consume(TokenType::Eq, "=")?;
        let step = self.expression()?;
        self.consume(TokenType::RParen, ")")?;

        let (label, body) = self.generate_body()?;
        let span = start_span.merge(self.current.span);
        Ok(ModuleItem::GenerateFor(GenerateFor {
            genvar,
            genvar_span,
            init,
            cond,
            step,
            label,
            body: Arc::new(body),
            span,
        }))
    }

    fn generate_if(&mut self) -> Result<ModuleItem, ParseError> {
        let start_span = self.current.span;
        self.advance(); // if
        self.consume(TokenType::LParen, "(")?;
        let cond = self.expression()?;
        self.consume(TokenType::RParen, ")")?;
        let (then_label, then_items) = self.generate_body()?;
        let (else_label, else_items) = if self.match_token(TokenType::KwElse) {
            let (label, items) = self.generate_body()?;
            (label, Some(Arc::new(items)))
        } else {
            (None, None)
        };
        let span = start_span.merge(self.current.span);
        Ok(ModuleItem::GenerateIf(GenerateIf {
            cond,
            then_label,
            then_items: Arc::new(then_items),
            else_label,
            else_items,
            span,
        }))
    }

    // begin [: label] items end, or a single unlabeled item.
    fn generate_body(&mut self) -> Result<(Option<NameId>, Vec<ModuleItem>), ParseError> {
        if self.match_token(TokenType::KwBegin) {
            let label = if self.match_token(TokenType::Colon) {
                let (name, _) = self.identifier("block label")?;
                Some(name)
            } else {
                None
            };
            let mut items = Vec::new();
            while !self.check(TokenType::KwEnd) && !self.check(TokenType::Eof) {
                items.push(self.module_item()?);
            }
            self.consume(TokenType::KwEnd, "end")?;
            Ok((label, items))
        } else {
            Ok((None, vec![self.module_item()?]))
        }
    }

    fn net_decl(&mut self) -> Result<ModuleItem, ParseError> {
        let start_span = self.current.span;
        self.advance(); // wire
        let ty = if self.at_data_type() && self.peek_is_data_type_prefix() {
            self.data_type()?
        } else {
            TypeSyntax::implicit(start_span)
        };
        let (name, name_span) = self.identifier("net name")?;
        let init = if self.match_token(TokenType::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, ";")?;
        Ok(ModuleItem::Net(NetDecl {
            ty,
            name,
            name_span,
            init,
            span: start_span.merge(name_span),
        }))
    }

    fn var_decl(&mut self) -> Result<ModuleItem, ParseError> {
        let decl = self.var_decl_inner()?;
        Ok(ModuleItem::Var(decl))
    }

    fn var_decl_inner(&mut self) -> Result<VarDecl, ParseError> {
        let start_span = self.current.span;
        let ty = self.data_type()?;
        let (name, name_span) = self.identifier("variable name")?;
        let mut unpacked_dims = Vec::new();
        while self.check(TokenType::LBracket) {
            unpacked_dims.push(self.range_syntax()?);
        }
        let init = if self.match_token(TokenType::Eq) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, ";")?;
        Ok(VarDecl {
            ty,
            name,
            name_span,
            unpacked_dims,
            init,
            span: start_span.merge(name_span),
        })
    }

    fn instantiation(&mut self) -> Result<ModuleItem, ParseError> {
        let start_span = self.current.span;
        let (module, module_span) = self.identifier("module name")?;

        let mut param_assignments = Vec::new();
        if self.match_token(TokenType::Hash) {
            self.consume(TokenType::LParen, "(")?;
            if !self.check(TokenType::RParen) {
                param_assignments = self.connection_list()?;
            }
            self.consume(TokenType::RParen, ")")?;
        }

        let mut instances = Vec::new();
        loop {
            let (name, name_span) = self.identifier("instance name")?;
            self.consume(TokenType::LParen, "(")?;
            let connections = if self.check(TokenType::RParen) {
                Vec::new()
            } else {
                self.connection_list()?
            };
            let end = self.current.span;
            self.consume(TokenType::RParen, ")")?;
            instances.push(HierInstance {
                name,
                name_span,
                connections,
                span: name_span.merge(end),
            });
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        let end = self.current.span;
        self.consume(TokenType::Semicolon, ";")?;
        Ok(ModuleItem::Instance(InstantiationDecl {
            module,
            module_span,
            param_assignments,
            instances,
            span: start_span.merge(end),
        }))
    }

    fn connection_list(&mut self) -> Result<Vec<ConnectionSyntax>, ParseError> {
        let mut connections = Vec::new();
        loop {
            let start_span = self.current.span;
            if self.match_token(TokenType::Dot) {
                let (name, name_span) = self.identifier("connection name")?;
                self.consume(TokenType::LParen, "(")?;
                let expr = if self.check(TokenType::RParen) {
                    None
                } else {
                    Some(self.expression()?)
                };
                let end = self.current.span;
                self.consume(TokenType::RParen, ")")?;
                connections.push(ConnectionSyntax {
                    name: Some((name, name_span)),
                    expr,
                    span: start_span.merge(end),
                });
            } else {
                let expr = self.expression()?;
                let span = expr.span;
                connections.push(ConnectionSyntax {
                    name: None,
                    expr: Some(expr),
                    span,
                });
            }
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        Ok(connections)
    }

    fn procedural_block(&mut self) -> Result<ModuleItem, ParseError> {
        let start_span = self.current.span;
        let kind = match self.current.ty {
            TokenType::KwInitial => ProceduralKind::Initial,
            TokenType::KwAlways => ProceduralKind::Always,
            TokenType::KwAlwaysComb => ProceduralKind::AlwaysComb,
            TokenType::KwAlwaysFF => ProceduralKind::AlwaysFF,
            _ => ProceduralKind::AlwaysLatch,
        };
        self.advance();

        // Skip an optional event control: @(...) or @*
        if self.match_token(TokenType::At) {
            if self.match_token(TokenType::LParen) {
                let mut depth = 1;
                while depth > 0 && !self.check(TokenType::Eof) {
                    if self.check(TokenType::LParen) {
                        depth += 1;
                    } else if self.check(TokenType::RParen) {
                        depth -= 1;
                    }
                    self.advance();
                }
            } else {
                self.advance(); // @* or @ident
            }
        }

        let body = self.statement()?;
        let span = start_span.merge(body.span);
        Ok(ModuleItem::Procedural(ProceduralBlock {
            kind,
            body: Arc::new(body),
            span,
        }))
    }

    fn function_decl(&mut self) -> Result<ModuleItem, ParseError> {
        let start_span = self.current.span;
        self.advance(); // function
        self.match_token(TokenType::KwAutomatic);
        let return_type = if self.at_data_type() && self.peek_is_data_type_prefix() {
            self.data_type()?
        } else {
            TypeSyntax::implicit(self.current.span)
        };
        let (name, name_span) = self.identifier("function name")?;

        let mut args = Vec::new();
        if self.match_token(TokenType::LParen) {
            if !self.check(TokenType::RParen) {
                loop {
                    let arg_start = self.current.span;
                    self.match_token(TokenType::KwInput);
                    let ty = if self.at_data_type() && self.peek_is_data_type_prefix() {
                        self.data_type()?
                    } else {
                        TypeSyntax::implicit(self.current.span)
                    };
                    let (arg_name, arg_name_span) = self.identifier("argument name")?;
                    args.push(FunctionArg {
                        ty,
                        name: arg_name,
                        name_span: arg_name_span,
                        span: arg_start.merge(arg_name_span),
                    });
                    if !self.match_token(TokenType::Comma) {
                        break;
                    }
                }
            }
            self.consume(TokenType::RParen, ")")?;
        }
        self.consume(TokenType::Semicolon, ";")?;

        let mut body = Vec::new();
        while !self.check(TokenType::KwEndFunction) && !self.check(TokenType::Eof) {
            body.push(self.statement()?);
        }
        let end = self.current.span;
        self.consume(TokenType::KwEndFunction, "endfunction")?;

        Ok(ModuleItem::Function(Arc::new(FunctionDecl {
            return_type,
            name,
            name_span,
            args,
            body,
            span: start_span.merge(end),
        })))
    }

    fn import_decl(&mut self) -> Result<ModuleItem, ParseError> {
        let start_span = self.current.span;
        self.advance(); // import
        let (package, package_span) = self.identifier("package name")?;
        self.consume(TokenType::ColonColon, "::")?;
        let name = if self.check(TokenType::Star) {
            self.advance();
            None
        } else {
            let (n, s) = self.identifier("import name")?;
            Some((n, s))
        };
        let end = self.current.span;
        self.consume(TokenType::Semicolon, ";")?;
        Ok(ModuleItem::Import(ImportDecl {
            package,
            package_span,
            name,
            span: start_span.merge(end),
        }))
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn at_data_type(&self) -> bool {
        matches!(
            self.current.ty,
            TokenType::KwBit
                | TokenType::KwLogic
                | TokenType::KwReg
                | TokenType::KwByte
                | TokenType::KwShortInt
                | TokenType::KwInt
                | TokenType::KwLongInt
                | TokenType::KwInteger
                | TokenType::KwTime
                | TokenType::KwReal
                | TokenType::KwRealTime
                | TokenType::KwShortReal
                | TokenType::KwString
                | TokenType::KwChandle
                | TokenType::KwEvent
                | TokenType::KwVoid
                | TokenType::KwEnum
                | TokenType::KwStruct
                | TokenType::Identifier
        )
    }

    // Distinguishes `int P = ...` from a bare `P = ...`: an identifier only
    // starts a data type when another identifier follows it.
    fn peek_is_data_type_prefix(&mut self) -> bool {
        if self.current.ty != TokenType::Identifier {
            return true;
        }
        matches!(
            self.peek(0).ty,
            TokenType::Identifier | TokenType::ColonColon
        )
    }

    fn data_type(&mut self) -> Result<TypeSyntax, ParseError> {
        let start_span = self.current.span;
        let kind = match self.current.ty {
            TokenType::KwBit => self.keyword_type(TypeKeyword::Bit),
            TokenType::KwLogic => self.keyword_type(TypeKeyword::Logic),
            TokenType::KwReg => self.keyword_type(TypeKeyword::Reg),
            TokenType::KwByte => self.keyword_type(TypeKeyword::Byte),
            TokenType::KwShortInt => self.keyword_type(TypeKeyword::ShortInt),
            TokenType::KwInt => self.keyword_type(TypeKeyword::Int),
            TokenType::KwLongInt => self.keyword_type(TypeKeyword::LongInt),
            TokenType::KwInteger => self.keyword_type(TypeKeyword::Integer),
            TokenType::KwTime => self.keyword_type(TypeKeyword::Time),
            TokenType::KwReal => self.keyword_type(TypeKeyword::Real),
            TokenType::KwRealTime => self.keyword_type(TypeKeyword::RealTime),
            TokenType::KwShortReal => self.keyword_type(TypeKeyword::ShortReal),
            TokenType::KwString => self.keyword_type(TypeKeyword::String),
            TokenType::KwChandle => self.keyword_type(TypeKeyword::Chandle),
            TokenType::KwEvent => self.keyword_type(TypeKeyword::Event),
            TokenType::KwVoid => self.keyword_type(TypeKeyword::Void),
            TokenType::KwEnum => return self.enum_type(start_span),
            TokenType::KwStruct => return self.struct_type(start_span),
            TokenType::Identifier => {
                let (name, _) = self.identifier("type name")?;
                if self.match_token(TokenType::ColonColon) {
                    let (member, _) = self.identifier("type name")?;
                    TypeSyntaxKind::Scoped(name, member)
                } else {
                    TypeSyntaxKind::Named(name)
                }
            }
            _ => {
                return Err(ParseError::new(
                    ParserError::ExpectedType {
                        found: self.current.ty.as_str().to_string(),
                        span: self.current.span.into(),
                    },
                    self.current.span,
                ))
            }
        };

        let signing = self.signing();
        let mut packed_dims = Vec::new();
        while self.check(TokenType::LBracket) {
            packed_dims.push(self.range_syntax()?);
        }
        let span = start_span.merge(packed_dims.last().map(|d| d.span).unwrap_or(start_span));
        Ok(TypeSyntax {
            kind,
            signing,
            packed_dims,
            span,
        })
    }

    fn keyword_type(&mut self, kw: TypeKeyword) -> TypeSyntaxKind {
        self.advance();
        TypeSyntaxKind::Keyword(kw)
    }

    fn signing(&mut self) -> Option<bool> {
        if self.match_token(TokenType::KwSigned) {
            Some(true)
        } else if self.match_token(TokenType::KwUnsigned) {
            Some(false)
        } else {
            None
        }
    }

    fn enum_type(&mut self, start_span: Span) -> Result<TypeSyntax, ParseError> {
        self.advance(); // enum
        let base = if self.at_data_type() && !self.check(TokenType::LBrace) {
            Some(Box::new(self.data_type()?))
        } else {
            None
        };
        self.consume(TokenType::LBrace, "{")?;
        let mut members = Vec::new();
        loop {
            let (name, name_span) = self.identifier("enum member name")?;
            let init = if self.match_token(TokenType::Eq) {
                Some(self.expression()?)
            } else {
                None
            };
            members.push(EnumMemberSyntax {
                name,
                name_span,
                init,
            });
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        let end = self.current.span;
        self.consume(TokenType::RBrace, "}")?;
        Ok(TypeSyntax {
            kind: TypeSyntaxKind::Enum { base, members },
            signing: None,
            packed_dims: Vec::new(),
            span: start_span.merge(end),
        })
    }

    fn struct_type(&mut self, start_span: Span) -> Result<TypeSyntax, ParseError> {
        self.advance(); // struct
        self.consume(TokenType::KwPacked, "packed")?;
        let signing = self.signing();
        self.consume(TokenType::LBrace, "{")?;
        let mut members = Vec::new();
        while !self.check(TokenType::RBrace) && !self.check(TokenType::Eof) {
            let ty = self.data_type()?;
            let (name, name_span) = self.identifier("struct member name")?;
            self.consume(TokenType::Semicolon, ";")?;
            members.push(StructMemberSyntax {
                ty,
                name,
                name_span,
            });
        }
        let end = self.current.span;
        self.consume(TokenType::RBrace, "}")?;
        Ok(TypeSyntax {
            kind: TypeSyntaxKind::PackedStruct { members },
            signing,
            packed_dims: Vec::new(),
            span: start_span.merge(end),
        })
    }

    fn range_syntax(&mut self) -> Result<RangeSyntax, ParseError> {
        let start_span = self.current.span;
        self.consume(TokenType::LBracket, "[")?;
        let left = self.expression()?;
        self.consume(TokenType::Colon, ":")?;
        let right = self.expression()?;
        let end = self.current.span;
        self.consume(TokenType::RBracket, "]")?;
        Ok(RangeSyntax {
            left,
            right,
            span: start_span.merge(end),
        })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn statement(&mut self) -> Result<StmtSyntax, ParseError> {
        let start_span = self.current.span;
        if self.starts_local_decl() {
            let decl = self.var_decl_inner()?;
            let span = decl.span;
            return Ok(StmtSyntax {
                kind: StmtSyntaxKind::VarDecl(decl),
                span,
            });
        }
        match self.current.ty {
            TokenType::KwBegin => {
                self.advance();
                let label = if self.match_token(TokenType::Colon) {
                    let (name, _) = self.identifier("block label")?;
                    Some(name)
                } else {
                    None
                };
                let mut stmts = Vec::new();
                while !self.check(TokenType::KwEnd) && !self.check(TokenType::Eof) {
                    stmts.push(self.statement()?);
                }
                let end = self.current.span;
                self.consume(TokenType::KwEnd, "end")?;
                Ok(StmtSyntax {
                    kind: StmtSyntaxKind::Block { label, stmts },
                    span: start_span.merge(end),
                })
            }
            TokenType::KwIf => {
                self.advance();
                self.consume(TokenType::LParen, "(")?;
                let cond = self.expression()?;
                self.consume(TokenType::RParen, ")")?;
                let then_stmt = Box::new(self.statement()?);
                let else_stmt = if self.match_token(TokenType::KwElse) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                let span = start_span.merge(
                    else_stmt
                        .as_deref()
                        .map(|s| s.span)
                        .unwrap_or(then_stmt.span),
                );
                Ok(StmtSyntax {
                    kind: StmtSyntaxKind::If {
                        cond,
                        then_stmt,
                        else_stmt,
                    },
                    span,
                })
            }
            TokenType::KwFor => {
                self.advance();
                self.consume(TokenType::LParen, "(")?;
                let init = if self.check(TokenType::Semicolon) {
                    None
                } else {
                    Some(Box::new(self.for_init()?))
                };
                self.consume(TokenType::Semicolon, ";")?;
                let cond = if self.check(TokenType::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume(TokenType::Semicolon, ";")?;
                let step = if self.check(TokenType::RParen) {
                    None
                } else {
                    Some(Box::new(self.simple_statement_no_semi()?))
                };
                self.consume(TokenType::RParen, ")")?;
                let body = Box::new(self.statement()?);
                let span = start_span.merge(body.span);
                Ok(StmtSyntax {
                    kind: StmtSyntaxKind::For {
                        init,
                        cond,
                        step,
                        body,
                    },
                    span,
                })
            }
            TokenType::KwCase | TokenType::KwCaseZ | TokenType::KwCaseX => {
                let kind = match self.current.ty {
                    TokenType::KwCase => CaseKind::Normal,
                    TokenType::KwCaseZ => CaseKind::CaseZ,
                    _ => CaseKind::CaseX,
                };
                self.advance();
                self.consume(TokenType::LParen, "(")?;
                let expr = self.expression()?;
                self.consume(TokenType::RParen, ")")?;
                let mut items = Vec::new();
                while !self.check(TokenType::KwEndCase) && !self.check(TokenType::Eof) {
                    let item_start = self.current.span;
                    let exprs = if self.match_token(TokenType::KwDefault) {
                        self.match_token(TokenType::Colon);
                        Vec::new()
                    } else {
                        let mut exprs = vec![self.expression()?];
                        while self.match_token(TokenType::Comma) {
                            exprs.push(self.expression()?);
                        }
                        self.consume(TokenType::Colon, ":")?;
                        exprs
                    };
                    let body = self.statement()?;
                    let span = item_start.merge(body.span);
                    items.push(CaseItemSyntax { exprs, body, span });
                }
                let end = self.current.span;
                self.consume(TokenType::KwEndCase, "endcase")?;
                Ok(StmtSyntax {
                    kind: StmtSyntaxKind::Case { kind, expr, items },
                    span: start_span.merge(end),
                })
            }
            TokenType::KwReturn => {
                self.advance();
                let value = if self.check(TokenType::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                let end = self.current.span;
                self.consume(TokenType::Semicolon, ";")?;
                Ok(StmtSyntax {
                    kind: StmtSyntaxKind::Return(value),
                    span: start_span.merge(end),
                })
            }
            TokenType::Semicolon => {
                self.advance();
                Ok(StmtSyntax {
                    kind: StmtSyntaxKind::Empty,
                    span: start_span,
                })
            }
            _ => {
                let stmt = self.simple_statement_no_semi()?;
                self.consume(TokenType::Semicolon, ";")?;
                Ok(stmt)
            }
        }
    }

    // A statement-level declaration: a data type followed by a name. A bare
    // identifier only starts a declaration when another identifier follows.
    fn starts_local_decl(&mut self) -> bool {
        self.at_data_type()
            && (self.current.ty != TokenType::Identifier
                || self.peek(0).ty == TokenType::Identifier)
    }

    fn for_init(&mut self) -> Result<StmtSyntax, ParseError> {
        if self.starts_local_decl() {
            // `for (int i = 0; ...)` declares the loop variable inline.
            let start_span = self.current.span;
            let ty = self.data_type()?;
            let (name, name_span) = self.identifier("variable name")?;
            self.consume(TokenType::Eq, "=")?;
            let init = self.expression()?;
            let span = start_span.merge(init.span);
            Ok(StmtSyntax {
                kind: StmtSyntaxKind::VarDecl(VarDecl {
                    ty,
                    name,
                    name_span,
                    unpacked_dims: Vec::new(),
                    init: Some(init),
                    span,
                }),
                span,
            })
        } else {
            self.simple_statement_no_semi()
        }
    }

    // An assignment or expression statement, without the trailing semicolon.
    fn simple_statement_no_semi(&mut self) -> Result<StmtSyntax, ParseError> {
        let start_span = self.current.span;
        let target = self.postfix_expression()?;
        match self.current.ty {
            TokenType::Eq => {
                self.advance();
                let value = self.expression()?;
                let span = start_span.merge(value.span);
                Ok(StmtSyntax {
                    kind: StmtSyntaxKind::Assign {
                        target,
                        value,
                        nonblocking: false,
                    },
                    span,
                })
            }
            TokenType::LtEq => {
                self.advance();
                let value = self.expression()?;
                let span = start_span.merge(value.span);
                Ok(StmtSyntax {
                    kind: StmtSyntaxKind::Assign {
                        target,
                        value,
                        nonblocking: true,
                    },
                    span,
                })
            }
            _ => {
                let span = target.span;
                Ok(StmtSyntax {
                    kind: StmtSyntaxKind::Expr(target),
                    span,
                })
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> Result<ExprSyntax, ParseError> {
        self.conditional_expression()
    }

    fn conditional_expression(&mut self) -> Result<ExprSyntax, ParseError> {
        let cond = self.binary_expression(0)?;
        if self.match_token(TokenType::Question) {
            let then_expr = self.expression()?;
            self.consume(TokenType::Colon, ":")?;
            let else_expr = self.conditional_expression()?;
            let span = cond.span.merge(else_expr.span);
            Ok(ExprSyntax {
                kind: ExprSyntaxKind::Conditional(
                    Box::new(cond),
                    Box::new(then_expr),
                    Box::new(else_expr),
                ),
                span,
            })
        } else {
            Ok(cond)
        }
    }

    fn binary_op(&self) -> Option<(BinaryOpSyntax, u8, bool)> {
        // (operator, precedence, right-assoc); higher binds tighter
        let op = match self.current.ty {
            TokenType::PipePipe => (BinaryOpSyntax::LogicalOr, 1, false),
            TokenType::AmpAmp => (BinaryOpSyntax::LogicalAnd, 2, false),
            TokenType::Pipe => (BinaryOpSyntax::BinaryOr, 3, false),
            TokenType::Caret => (BinaryOpSyntax::BinaryXor, 4, false),
            TokenType::TildeCaret => (BinaryOpSyntax::BinaryXnor, 4, false),
            TokenType::Amp => (BinaryOpSyntax::BinaryAnd, 5, false),
            TokenType::EqEq => (BinaryOpSyntax::Equality, 6, false),
            TokenType::BangEq => (BinaryOpSyntax::Inequality, 6, false),
            TokenType::EqEqEq => (BinaryOpSyntax::CaseEquality, 6, false),
            TokenType::BangEqEq => (BinaryOpSyntax::CaseInequality, 6, false),
            TokenType::EqEqQuest => (BinaryOpSyntax::WildcardEquality, 6, false),
            TokenType::BangEqQuest => (BinaryOpSyntax::WildcardInequality, 6, false),
            TokenType::Lt => (BinaryOpSyntax::LessThan, 7, false),
            TokenType::LtEq => (BinaryOpSyntax::LessThanEqual, 7, false),
            TokenType::Gt => (BinaryOpSyntax::GreaterThan, 7, false),
            TokenType::GtEq => (BinaryOpSyntax::GreaterThanEqual, 7, false),
            TokenType::LtLt => (BinaryOpSyntax::LogicalShiftLeft, 8, false),
            TokenType::GtGt => (BinaryOpSyntax::LogicalShiftRight, 8, false),
            TokenType::LtLtLt => (BinaryOpSyntax::ArithmeticShiftLeft, 8, false),
            TokenType::GtGtGt => (BinaryOpSyntax::ArithmeticShiftRight, 8, false),
            TokenType::Plus => (BinaryOpSyntax::Add, 9, false),
            TokenType::Minus => (BinaryOpSyntax::Subtract, 9, false),
            TokenType::Star => (BinaryOpSyntax::Multiply, 10, false),
            TokenType::Slash => (BinaryOpSyntax::Divide, 10, false),
            TokenType::Percent => (BinaryOpSyntax::Mod, 10, false),
            TokenType::StarStar => (BinaryOpSyntax::Power, 11, true),
            _ => return None,
        };
        Some(op)
    }

    fn binary_expression(&mut self, min_prec: u8) -> Result<ExprSyntax, ParseError> {
        let mut left = self.unary_expression()?;
        while let Some((op, prec, right_assoc)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = if right_assoc { prec } else { prec + 1 };
            let right = self.binary_expression(next_min)?;
            let span = left.span.merge(right.span);
            left = ExprSyntax {
                kind: ExprSyntaxKind::Binary(op, Box::new(left), Box::new(right)),
                span,
            };
        }
        Ok(left)
    }

    fn unary_expression(&mut self) -> Result<ExprSyntax, ParseError> {
        let start_span = self.current.span;
        let op = match self.current.ty {
            TokenType::Plus => Some(UnaryOpSyntax::Plus),
            TokenType::Minus => Some(UnaryOpSyntax::Minus),
            TokenType::Tilde => Some(UnaryOpSyntax::BitwiseNot),
            TokenType::Bang => Some(UnaryOpSyntax::LogicalNot),
            TokenType::Amp => Some(UnaryOpSyntax::ReductionAnd),
            TokenType::Pipe => Some(UnaryOpSyntax::ReductionOr),
            TokenType::Caret => Some(UnaryOpSyntax::ReductionXor),
            TokenType::TildeAmp => Some(UnaryOpSyntax::ReductionNand),
            TokenType::TildePipe => Some(UnaryOpSyntax::ReductionNor),
            TokenType::TildeCaret => Some(UnaryOpSyntax::ReductionXnor),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary_expression()?;
            let span = start_span.merge(operand.span);
            return Ok(ExprSyntax {
                kind: ExprSyntaxKind::Unary(op, Box::new(operand)),
                span,
            });
        }
        self.postfix_expression()
    }

    fn postfix_expression(&mut self) -> Result<ExprSyntax, ParseError> {
        let mut expr = self.primary_expression()?;
        loop {
            match self.current.ty {
                TokenType::LBracket => {
                    self.advance();
                    let first = self.expression()?;
                    match self.current.ty {
                        TokenType::Colon => {
                            self.advance();
                            let right = self.expression()?;
                            let end = self.current.span;
                            self.consume(TokenType::RBracket, "]")?;
                            let span = expr.span.merge(end);
                            expr = ExprSyntax {
                                kind: ExprSyntaxKind::RangeSelect(
                                    Box::new(expr),
                                    RangeSelectKind::Simple,
                                    Box::new(first),
                                    Box::new(right),
                                ),
                                span,
                            };
                        }
                        TokenType::PlusColon | TokenType::MinusColon => {
                            let kind = if self.current.ty == TokenType::PlusColon {
                                RangeSelectKind::IndexedUp
                            } else {
                                RangeSelectKind::IndexedDown
                            };
                            self.advance();
                            let width = self.expression()?;
                            let end = self.current.span;
                            self.consume(TokenType::RBracket, "]")?;
                            let span = expr.span.merge(end);
                            expr = ExprSyntax {
                                kind: ExprSyntaxKind::RangeSelect(
                                    Box::new(expr),
                                    kind,
                                    Box::new(first),
                                    Box::new(width),
                                ),
                                span,
                            };
                        }
                        _ => {
                            let end = self.current.span;
                            self.consume(TokenType::RBracket, "]")?;
                            let span = expr.span.merge(end);
                            expr = ExprSyntax {
                                kind: ExprSyntaxKind::ElementSelect(
                                    Box::new(expr),
                                    Box::new(first),
                                ),
                                span,
                            };
                        }
                    }
                }
                TokenType::Dot => {
                    self.advance();
                    let (name, name_span) = self.identifier("member name")?;
                    let span = expr.span.merge(name_span);
                    expr = ExprSyntax {
                        kind: ExprSyntaxKind::MemberAccess(Box::new(expr), name, name_span),
                        span,
                    };
                }
                TokenType::LParen => {
                    // Calls apply to plain or scoped names only.
                    let callable = matches!(
                        expr.kind,
                        ExprSyntaxKind::Identifier(_) | ExprSyntaxKind::Scoped(..)
                    );
                    if !callable {
                        break;
                    }
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenType::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.match_token(TokenType::Comma) {
                                break;
                            }
                        }
                    }
                    let end = self.current.span;
                    self.consume(TokenType::RParen, ")")?;
                    let span = expr.span.merge(end);
                    expr = ExprSyntax {
                        kind: ExprSyntaxKind::Call(Box::new(expr), args),
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary_expression(&mut self) -> Result<ExprSyntax, ParseError> {
        let span = self.current.span;
        match self.current.ty {
            TokenType::IntLiteral => {
                let digits = self.current.lexeme.clone();
                self.advance();
                Ok(ExprSyntax {
                    kind: ExprSyntaxKind::IntLiteral(IntegerLiteralSyntax {
                        size: None,
                        signed: true,
                        base: None,
                        digits,
                    }),
                    span,
                })
            }
            TokenType::BasedLiteral => {
                let lit = parse_based_literal(&self.current.lexeme);
                self.advance();
                Ok(ExprSyntax {
                    kind: ExprSyntaxKind::IntLiteral(lit),
                    span,
                })
            }
            TokenType::UnbasedLiteral => {
                let c = self.current.lexeme.chars().nth(1).unwrap_or('x');
                self.advance();
                Ok(ExprSyntax {
                    kind: ExprSyntaxKind::UnbasedLiteral(c),
                    span,
                })
            }
            TokenType::RealLiteral => {
                let value = self
                    .current
                    .lexeme
                    .replace('_', "")
                    .parse::<f64>()
                    .unwrap_or(0.0);
                self.advance();
                Ok(ExprSyntax {
                    kind: ExprSyntaxKind::RealLiteral(value),
                    span,
                })
            }
            TokenType::StringLiteral => {
                let text = self.current.lexeme.clone();
                let inner = text
                    .strip_prefix('"')
                    .and_then(|t| t.strip_suffix('"'))
                    .unwrap_or(&text)
                    .to_string();
                self.advance();
                Ok(ExprSyntax {
                    kind: ExprSyntaxKind::StringLiteral(unescape(&inner)),
                    span,
                })
            }
            TokenType::KwNull => {
                self.advance();
                Ok(ExprSyntax {
                    kind: ExprSyntaxKind::NullLiteral,
                    span,
                })
            }
            TokenType::SystemName => {
                let name = self.interner.intern(&self.current.lexeme);
                self.advance();
                let mut args = Vec::new();
                if self.match_token(TokenType::LParen) {
                    if !self.check(TokenType::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.match_token(TokenType::Comma) {
                                break;
                            }
                        }
                    }
                    self.consume(TokenType::RParen, ")")?;
                }
                Ok(ExprSyntax {
                    kind: ExprSyntaxKind::SystemCall(name, span, args),
                    span,
                })
            }
            TokenType::Identifier => {
                let (name, name_span) = self.identifier("identifier")?;
                if self.check(TokenType::ColonColon) {
                    self.advance();
                    let (member, member_span) = self.identifier("name")?;
                    Ok(ExprSyntax {
                        kind: ExprSyntaxKind::Scoped(name, name_span, member, member_span),
                        span: name_span.merge(member_span),
                    })
                } else {
                    Ok(ExprSyntax {
                        kind: ExprSyntaxKind::Identifier(name),
                        span: name_span,
                    })
                }
            }
            TokenType::LParen => {
                self.advance();
                let inner = self.expression()?;
                let end = self.current.span;
                self.consume(TokenType::RParen, ")")?;
                Ok(ExprSyntax {
                    kind: ExprSyntaxKind::Paren(Box::new(inner)),
                    span: span.merge(end),
                })
            }
            TokenType::LBrace => self.concat_expression(),
            TokenType::Apostrophe => self.assignment_pattern(),
            _ => Err(ParseError::new(
                ParserError::ExpectedExpression {
                    found: self.current.ty.as_str().to_string(),
                    span: self.current.span.into(),
                },
                self.current.span,
            )),
        }
    }

    // { a, b } concatenation or { N { a, b } } replication.
    fn concat_expression(&mut self) -> Result<ExprSyntax, ParseError> {
        let start_span = self.current.span;
        self.advance(); // {
        let first = self.expression()?;
        if self.check(TokenType::LBrace) {
            self.advance();
            let mut operands = vec![self.expression()?];
            while self.match_token(TokenType::Comma) {
                operands.push(self.expression()?);
            }
            self.consume(TokenType::RBrace, "}")?;
            let end = self.current.span;
            self.consume(TokenType::RBrace, "}")?;
            return Ok(ExprSyntax {
                kind: ExprSyntaxKind::Replication(Box::new(first), operands),
                span: start_span.merge(end),
            });
        }
        let mut operands = vec![first];
        while self.match_token(TokenType::Comma) {
            operands.push(self.expression()?);
        }
        let end = self.current.span;
        self.consume(TokenType::RBrace, "}")?;
        Ok(ExprSyntax {
            kind: ExprSyntaxKind::Concat(operands),
            span: start_span.merge(end),
        })
    }

    // '{ ... } assignment pattern.
    fn assignment_pattern(&mut self) -> Result<ExprSyntax, ParseError> {
        let start_span = self.current.span;
        self.advance(); // '
        self.consume(TokenType::LBrace, "{")?;

        // '{ N { ... } } replicated pattern.
        let first = self.expression()?;
        if self.check(TokenType::LBrace) {
            self.advance();
            let mut operands = vec![self.expression()?];
            while self.match_token(TokenType::Comma) {
                operands.push(self.expression()?);
            }
            self.consume(TokenType::RBrace, "}")?;
            let end = self.current.span;
            self.consume(TokenType::RBrace, "}")?;
            return Ok(ExprSyntax {
                kind: ExprSyntaxKind::ReplicatedPattern(Box::new(first), operands),
                span: start_span.merge(end),
            });
        }

        let mut items = Vec::new();
        // Structured pattern when the first element is `name: value`.
        if self.check(TokenType::Colon) {
            let key = match &first.kind {
                ExprSyntaxKind::Identifier(name) => Some((*name, first.span)),
                _ => None,
            };
            self.advance(); // :
            let value = self.expression()?;
            items.push(AssignmentPatternItem { key, value });
            while self.match_token(TokenType::Comma) {
                let (name, name_span) = self.identifier("member name")?;
                self.consume(TokenType::Colon, ":")?;
                let value = self.expression()?;
                items.push(AssignmentPatternItem {
                    key: Some((name, name_span)),
                    value,
                });
            }
        } else {
            items.push(AssignmentPatternItem {
                key: None,
                value: first,
            });
            while self.match_token(TokenType::Comma) {
                items.push(AssignmentPatternItem {
                    key: None,
                    value: self.expression()?,
                });
            }
        }
        let end = self.current.span;
        self.consume(TokenType::RBrace, "}")?;
        Ok(ExprSyntax {
            kind: ExprSyntaxKind::AssignmentPattern(items),
            span: start_span.merge(end),
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn identifier(&mut self, what: &str) -> Result<(NameId, Span), ParseError> {
        if self.current.ty != TokenType::Identifier {
            return Err(ParseError::new(
                ParserError::ExpectedToken {
                    expected: what.to_string(),
                    found: self.current.ty.as_str().to_string(),
                    span: self.current.span.into(),
                },
                self.current.span,
            ));
        }
        let name = self.interner.intern(&self.current.lexeme);
        let span = self.current.span;
        self.advance();
        Ok((name, span))
    }

    fn advance(&mut self) {
        self.current = match self.lookahead.pop_front() {
            Some(t) => t,
            None => self.lexer.next_token(),
        };
    }

    fn peek(&mut self, n: usize) -> &Token {
        while self.lookahead.len() <= n {
            let t = self.lexer.next_token();
            self.lookahead.push_back(t);
        }
        &self.lookahead[n]
    }

    fn check(&self, ty: TokenType) -> bool {
        self.current.ty == ty
    }

    fn match_token(&mut self, ty: TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, ty: TokenType, expected: &str) -> Result<(), ParseError> {
        if self.check(ty) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(
                ParserError::ExpectedToken {
                    expected: expected.to_string(),
                    found: self.current.ty.as_str().to_string(),
                    span: self.current.span.into(),
                },
                self.current.span,
            ))
        }
    }

    fn unexpected(&self) -> ParseError {
        ParseError::new(
            ParserError::UnexpectedToken {
                token: self.current.ty.as_str().to_string(),
                span: self.current.span.into(),
            },
            self.current.span,
        )
    }
}

// Split "4'sb10x1" into its parts.
fn parse_based_literal(lexeme: &str) -> IntegerLiteralSyntax {
    let tick = lexeme.find('\'').unwrap_or(0);
    let size = if tick > 0 {
        lexeme[..tick].replace('_', "").parse::<u32>().ok()
    } else {
        None
    };
    let mut rest = lexeme[tick + 1..].chars();
    let mut signed = false;
    let mut base_char = rest.next().unwrap_or('d');
    if base_char == 's' || base_char == 'S' {
        signed = true;
        base_char = rest.next().unwrap_or('d');
    }
    let base = LiteralBase::from_char(base_char).unwrap_or(LiteralBase::Decimal);
    IntegerLiteralSyntax {
        size,
        signed,
        base: Some(base),
        digits: rest.collect(),
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SourceUnit {
        let mut interner = Interner::new();
        let mut parser = Parser::new(source, &mut interner);
        parser.parse_unit().expect("parse failed")
    }

    #[test]
    fn parses_empty_module() {
        let unit = parse("module top; endmodule");
        assert_eq!(unit.items.len(), 1);
        match &unit.items[0] {
            Item::Definition(d) => {
                assert_eq!(d.kind, DefinitionKind::Module);
                assert!(d.items.is_empty());
            }
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn parses_parameter_ports() {
        let unit = parse("module m #(parameter P = 1, Q = 2, parameter int R = 3)(); endmodule");
        match &unit.items[0] {
            Item::Definition(d) => {
                assert_eq!(d.param_ports.len(), 3);
                assert!(matches!(
                    d.param_ports[0].ty.kind,
                    TypeSyntaxKind::Implicit
                ));
                assert!(matches!(
                    d.param_ports[2].ty.kind,
                    TypeSyntaxKind::Keyword(TypeKeyword::Int)
                ));
            }
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn parses_instantiation_with_params() {
        let unit = parse("module top; m #(.P(5)) u(.a(x), .b(y)); endmodule");
        match &unit.items[0] {
            Item::Definition(d) => match &d.items[0] {
                ModuleItem::Instance(inst) => {
                    assert_eq!(inst.param_assignments.len(), 1);
                    assert_eq!(inst.instances.len(), 1);
                    assert_eq!(inst.instances[0].connections.len(), 2);
                }
                other => panic!("expected instance, got {:?}", other),
            },
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn distinguishes_var_decl_from_instance() {
        let unit = parse("module top; int x; foo u(); endmodule");
        match &unit.items[0] {
            Item::Definition(d) => {
                assert!(matches!(d.items[0], ModuleItem::Var(_)));
                assert!(matches!(d.items[1], ModuleItem::Instance(_)));
            }
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn parses_expressions_with_precedence() {
        let unit = parse("module m; localparam X = 1 + 2 * 3; endmodule");
        match &unit.items[0] {
            Item::Definition(d) => match &d.items[0] {
                ModuleItem::Param(p) => {
                    let init = p.init.as_ref().unwrap();
                    match &init.kind {
                        ExprSyntaxKind::Binary(BinaryOpSyntax::Add, _, rhs) => {
                            assert!(matches!(
                                rhs.kind,
                                ExprSyntaxKind::Binary(BinaryOpSyntax::Multiply, _, _)
                            ));
                        }
                        other => panic!("expected add, got {:?}", other),
                    }
                }
                _ => panic!("expected param"),
            },
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn power_is_right_associative() {
        let mut interner = Interner::new();
        let mut parser = Parser::new("2 ** 3 ** 2", &mut interner);
        let e = parser.parse_expression().unwrap();
        match e.kind {
            ExprSyntaxKind::Binary(BinaryOpSyntax::Power, _, rhs) => {
                assert!(matches!(
                    rhs.kind,
                    ExprSyntaxKind::Binary(BinaryOpSyntax::Power, _, _)
                ));
            }
            other => panic!("expected power, got {:?}", other),
        }
    }

    #[test]
    fn parses_concat_and_replication() {
        let mut interner = Interner::new();
        let mut parser = Parser::new("{a, {3{b}}}", &mut interner);
        let e = parser.parse_expression().unwrap();
        match e.kind {
            ExprSyntaxKind::Concat(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[1].kind, ExprSyntaxKind::Replication(_, _)));
            }
            other => panic!("expected concat, got {:?}", other),
        }
    }

    #[test]
    fn parses_selects() {
        let mut interner = Interner::new();
        let mut parser = Parser::new("a[3:0]", &mut interner);
        let e = parser.parse_expression().unwrap();
        assert!(matches!(
            e.kind,
            ExprSyntaxKind::RangeSelect(_, RangeSelectKind::Simple, _, _)
        ));

        let mut parser = Parser::new("a[i]", &mut interner);
        let e = parser.parse_expression().unwrap();
        assert!(matches!(e.kind, ExprSyntaxKind::ElementSelect(_, _)));

        let mut parser = Parser::new("a[i +: 4]", &mut interner);
        let e = parser.parse_expression().unwrap();
        assert!(matches!(
            e.kind,
            ExprSyntaxKind::RangeSelect(_, RangeSelectKind::IndexedUp, _, _)
        ));
    }

    #[test]
    fn parses_based_literal_forms() {
        let mut interner = Interner::new();
        let mut parser = Parser::new("4'sb10x1", &mut interner);
        let e = parser.parse_expression().unwrap();
        match e.kind {
            ExprSyntaxKind::IntLiteral(lit) => {
                assert_eq!(lit.size, Some(4));
                assert!(lit.signed);
                assert_eq!(lit.base, Some(LiteralBase::Binary));
                assert_eq!(lit.digits, "10x1");
            }
            other => panic!("expected int literal, got {:?}", other),
        }
    }

    #[test]
    fn parses_hierarchical_name() {
        let mut interner = Interner::new();
        let mut parser = Parser::new("top.u.x", &mut interner);
        let e = parser.parse_expression().unwrap();
        let path = e.as_name_path().expect("name path");
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn parses_generate_for() {
        let unit = parse(
            "module m; genvar i; for (i = 0; i < 4; i = i + 1) begin : g \
             wire w; end endmodule",
        );
        match &unit.items[0] {
            Item::Definition(d) => {
                assert!(matches!(d.items[0], ModuleItem::Genvar(_)));
                match &d.items[1] {
                    ModuleItem::GenerateFor(g) => {
                        assert!(g.label.is_some());
                        assert_eq!(g.body.len(), 1);
                    }
                    other => panic!("expected generate for, got {:?}", other),
                }
            }
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn parses_function() {
        let unit = parse(
            "module m; function int f(int n); return n + 1; endfunction endmodule",
        );
        match &unit.items[0] {
            Item::Definition(d) => match &d.items[0] {
                ModuleItem::Function(f) => {
                    assert_eq!(f.args.len(), 1);
                    assert_eq!(f.body.len(), 1);
                }
                other => panic!("expected function, got {:?}", other),
            },
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn parses_initial_block_with_statements() {
        let unit = parse(
            "module m; logic [7:0] b; initial begin b = 8'hff; if (b) b <= 0; end endmodule",
        );
        match &unit.items[0] {
            Item::Definition(d) => {
                assert!(matches!(d.items[1], ModuleItem::Procedural(_)));
            }
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn parses_package_and_import() {
        let unit = parse("package p; parameter W = 8; endpackage module m; import p::*; endmodule");
        assert_eq!(unit.items.len(), 2);
        match &unit.items[1] {
            Item::Definition(d) => {
                assert!(matches!(d.items[0], ModuleItem::Import(_)));
            }
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn parses_case_statement() {
        let unit = parse(
            "module m; logic [1:0] s; initial case (s) 2'b00: s = 1; default: s = 0; endcase endmodule",
        );
        match &unit.items[0] {
            Item::Definition(d) => match &d.items[1] {
                ModuleItem::Procedural(p) => match &p.body.kind {
                    StmtSyntaxKind::Case { items, .. } => assert_eq!(items.len(), 2),
                    other => panic!("expected case, got {:?}", other),
                },
                other => panic!("expected procedural, got {:?}", other),
            },
            _ => panic!("expected definition"),
        }
    }

    #[test]
    fn parses_defparam() {
        let unit = parse("module top; defparam u.P = 5; endmodule");
        match &unit.items[0] {
            Item::Definition(d) => match &d.items[0] {
                ModuleItem::Defparam(dp) => assert_eq!(dp.target.len(), 2),
                other => panic!("expected defparam, got {:?}", other),
            },
            _ => panic!("expected definition"),
        }
    }
}
