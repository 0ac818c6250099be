use std::cell::RefCell;
use std::rc::Rc;

use crate::config::GlobalConfig;
use crate::eval::context::{EvalContext, EvalResult};
use crate::eval::expr::{evaluate, optimize_in_place, Expr, ExprLocation, ExprNode, InitError};
use crate::object::Object;

/// Shape of the container a generator fills. A per-instance strategy rather
/// than a subtype split, so one generator body can serve both shapes when
/// driven by a runtime flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    List,
    Dict,
}

impl ContainerKind {
    pub fn new_container(&self) -> Object {
        match self {
            ContainerKind::List => Object::empty_list(),
            ContainerKind::Dict => Object::empty_dict(),
        }
    }

    /// Sub-container chained to `parent`, inheriting its flavor. None when
    /// the parent is not a container.
    pub fn create_child(&self, parent: &Object) -> Option<Object> {
        match self {
            ContainerKind::List => parent.create_list_child(),
            ContainerKind::Dict => parent.create_dict_child(),
        }
    }
}

/// The slot holding a generator's fillable expression: the node that
/// evaluates to the container the result is assigned/appended into.
///
/// The root generator owns the slot; inner generators hold a clone of the
/// handle (a non-owning structural link: nesting only exists while the root
/// is being evaluated, so the root always outlives them).
#[derive(Clone, Default)]
pub struct FillableRef(Rc<RefCell<Option<ExprNode>>>);

impl FillableRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, expr: ExprNode) {
        *self.0.borrow_mut() = Some(expr);
    }

    pub fn is_set(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        let slot = self.0.borrow();
        match slot.as_deref() {
            Some(expr) => evaluate(expr, ctx),
            None => Err(ctx.fail("generator has no fillable target", None, None)),
        }
    }

    pub fn optimize(&self) {
        if let Some(expr) = self.0.borrow_mut().as_mut() {
            optimize_in_place(expr);
        }
    }

    pub fn init(&self, cfg: &GlobalConfig) -> Result<(), InitError> {
        match self.0.borrow_mut().as_mut() {
            Some(expr) => expr.init(cfg),
            None => Ok(()),
        }
    }

    pub fn deinit(&self, cfg: &GlobalConfig) {
        if let Some(expr) = self.0.borrow_mut().as_mut() {
            expr.deinit(cfg);
        }
    }
}

/// A node that fills a container instead of producing a scalar: the
/// container is created by the node bound into the fillable slot, then
/// `generate` populates it.
pub trait GeneratorExpr: Expr {
    fn generate(&self, ctx: &mut EvalContext<'_>, fillable: &Object) -> EvalResult<()>;

    fn container_kind(&self) -> ContainerKind;

    fn fillable(&self) -> &FillableRef;
}

/// Shared evaluation body for every generator: obtain the fillable
/// container, check its shape, run `generate`, yield the filled container.
pub fn eval_generator(generator: &dyn GeneratorExpr, ctx: &mut EvalContext<'_>) -> EvalResult {
    let fillable = generator.fillable().eval(ctx)?;

    if !fillable.is_dict() && !fillable.is_list() {
        return Err(ctx.fail(
            "cannot fill object: dict or list is expected",
            generator.location(),
            Some(&fillable),
        ));
    }

    generator.generate(ctx, &fillable)?;
    Ok(fillable)
}

/// Expression that materializes a generator's container: a fresh root
/// container, or a child chained to the evaluated fillable parent.
pub struct CreateContainerExpr {
    kind: ContainerKind,
    fillable_parent: Option<ExprNode>,
    location: Option<ExprLocation>,
}

impl CreateContainerExpr {
    pub fn boxed(kind: ContainerKind, fillable_parent: Option<ExprNode>) -> ExprNode {
        Box::new(Self {
            kind,
            fillable_parent,
            location: None,
        })
    }
}

impl Expr for CreateContainerExpr {
    fn name(&self) -> &'static str {
        "create_container"
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    fn optimize(&mut self) -> Option<ExprNode> {
        if let Some(parent) = &mut self.fillable_parent {
            optimize_in_place(parent);
        }
        None
    }

    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        match &mut self.fillable_parent {
            Some(parent) => parent.init(cfg),
            None => Ok(()),
        }
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        if let Some(parent) = &mut self.fillable_parent {
            parent.deinit(cfg);
        }
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        match &self.fillable_parent {
            None => Ok(self.kind.new_container()),
            Some(parent) => {
                let parent = evaluate(parent.as_ref(), ctx)?;
                self.kind.create_child(&parent).ok_or_else(|| {
                    ctx.fail(
                        "cannot create container: parent is not a container",
                        self.location.as_ref(),
                        Some(&parent),
                    )
                })
            }
        }
    }
}

/// Binds a free-standing generator to a fresh root container of its own
/// kind. The argument-binding layer uses this for generators evaluated in
/// value position.
pub fn bind_root_container(generator: &dyn GeneratorExpr) {
    generator.fillable().set(CreateContainerExpr::boxed(
        generator.container_kind(),
        None,
    ));
}
