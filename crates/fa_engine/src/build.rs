//! Small constructors for the synthesized AST shapes.

use swc_common::DUMMY_SP;
use swc_ecma_ast as ast;

pub(crate) const RETURN: &str = "$return";
pub(crate) const ERROR: &str = "$error";
pub(crate) const ASYNCBIND: &str = "$asyncbind";

pub(crate) fn ident(name: &str) -> ast::Ident {
    ast::Ident::new_no_ctxt(name.into(), DUMMY_SP)
}

pub(crate) fn ident_expr(name: &str) -> Box<ast::Expr> {
    Box::new(ast::Expr::Ident(ident(name)))
}

pub(crate) fn this_expr() -> Box<ast::Expr> {
    Box::new(ast::Expr::This(ast::ThisExpr { span: DUMMY_SP }))
}

pub(crate) fn true_expr() -> Box<ast::Expr> {
    Box::new(ast::Expr::Lit(ast::Lit::Bool(ast::Bool {
        span: DUMMY_SP,
        value: true,
    })))
}

/// `obj.prop`, parenthesizing `obj` when it would not bind as a member object.
pub(crate) fn member(obj: Box<ast::Expr>, prop: &str) -> Box<ast::Expr> {
    Box::new(ast::Expr::Member(ast::MemberExpr {
        span: DUMMY_SP,
        obj: member_object(obj),
        prop: ast::MemberProp::Ident(ast::IdentName::new(prop.into(), DUMMY_SP)),
    }))
}

fn member_object(obj: Box<ast::Expr>) -> Box<ast::Expr> {
    match &*obj {
        ast::Expr::Ident(_)
        | ast::Expr::This(_)
        | ast::Expr::Call(_)
        | ast::Expr::Member(_)
        | ast::Expr::Paren(_)
        | ast::Expr::Array(_)
        | ast::Expr::Object(_)
        | ast::Expr::Fn(_)
        | ast::Expr::Lit(ast::Lit::Str(_)) => obj,
        _ => Box::new(ast::Expr::Paren(ast::ParenExpr {
            span: DUMMY_SP,
            expr: obj,
        })),
    }
}

pub(crate) fn call(callee: Box<ast::Expr>, args: Vec<Box<ast::Expr>>) -> Box<ast::Expr> {
    Box::new(ast::Expr::Call(ast::CallExpr {
        span: DUMMY_SP,
        callee: ast::Callee::Expr(callee),
        args: args
            .into_iter()
            .map(|expr| ast::ExprOrSpread { spread: None, expr })
            .collect(),
        type_args: None,
        ..Default::default()
    }))
}

pub(crate) fn new_expr(callee: Box<ast::Expr>, args: Vec<Box<ast::Expr>>) -> Box<ast::Expr> {
    Box::new(ast::Expr::New(ast::NewExpr {
        span: DUMMY_SP,
        callee,
        args: Some(
            args.into_iter()
                .map(|expr| ast::ExprOrSpread { spread: None, expr })
                .collect(),
        ),
        type_args: None,
        ..Default::default()
    }))
}

/// `function (p0, p1, ...) { stmts }`
pub(crate) fn fn_expr(params: &[ast::Ident], stmts: Vec<ast::Stmt>) -> Box<ast::Expr> {
    let params = params
        .iter()
        .map(|id| ast::Param {
            span: DUMMY_SP,
            decorators: vec![],
            pat: ast::Pat::Ident(ast::BindingIdent {
                id: id.clone(),
                type_ann: None,
            }),
        })
        .collect();

    Box::new(ast::Expr::Fn(ast::FnExpr {
        ident: None,
        function: Box::new(ast::Function {
            params,
            body: Some(ast::BlockStmt {
                stmts,
                ..Default::default()
            }),
            ..Default::default()
        }),
    }))
}

/// `<fn>.$asyncbind(this, <catcher>)`
pub(crate) fn asyncbind(function: Box<ast::Expr>, catcher: Box<ast::Expr>) -> Box<ast::Expr> {
    call(member(function, ASYNCBIND), vec![this_expr(), catcher])
}

pub(crate) fn return_stmt(arg: Option<Box<ast::Expr>>) -> ast::Stmt {
    ast::Stmt::Return(ast::ReturnStmt {
        span: DUMMY_SP,
        arg,
    })
}

/// `<target> = <value>;`
pub(crate) fn assign_stmt(target: ast::BindingIdent, value: Box<ast::Expr>) -> ast::Stmt {
    ast::Stmt::Expr(ast::ExprStmt {
        span: DUMMY_SP,
        expr: Box::new(ast::Expr::Assign(ast::AssignExpr {
            span: DUMMY_SP,
            op: ast::AssignOp::Assign,
            left: ast::AssignTarget::Simple(ast::SimpleAssignTarget::Ident(target)),
            right: value,
        })),
    })
}

/// `var a, b;`
pub(crate) fn var_decl(names: Vec<ast::BindingIdent>) -> ast::Stmt {
    ast::Stmt::Decl(ast::Decl::Var(Box::new(ast::VarDecl {
        span: DUMMY_SP,
        ctxt: Default::default(),
        kind: ast::VarDeclKind::Var,
        declare: false,
        decls: names
            .into_iter()
            .map(|name| ast::VarDeclarator {
                span: DUMMY_SP,
                name: ast::Pat::Ident(name),
                init: None,
                definite: false,
            })
            .collect(),
    })))
}

/// `return $return(<arg>);`
pub(crate) fn resolve_stmt(arg: Option<Box<ast::Expr>>) -> ast::Stmt {
    return_stmt(Some(call(ident_expr(RETURN), arg.into_iter().collect())))
}
