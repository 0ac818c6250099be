use crate::config::GlobalConfig;
use crate::eval::context::{EvalContext, EvalResult};
use crate::eval::expr::{evaluate, optimize_in_place, Expr, ExprLocation, ExprNode, InitError};
use crate::eval::generator::{eval_generator, ContainerKind, FillableRef, GeneratorExpr};
use crate::eval::literal::is_literal;
use crate::object::Object;

/// One element of a literal list/dict body: an optional key expression and a
/// value expression. `cloneable` is set during optimization when the value
/// is a literal, so every fill stores an independent copy instead of sharing
/// one object across evaluations.
pub struct GenElem {
    key: Option<ExprNode>,
    value: ExprNode,
    cloneable: bool,
}

impl GenElem {
    pub fn new(value: ExprNode) -> Self {
        Self {
            key: None,
            value,
            cloneable: false,
        }
    }

    pub fn keyed(key: ExprNode, value: ExprNode) -> Self {
        Self {
            key: Some(key),
            value,
            cloneable: false,
        }
    }

    pub fn key_expr(&self) -> Option<&dyn Expr> {
        self.key.as_deref()
    }

    pub fn value_expr(&self) -> &dyn Expr {
        self.value.as_ref()
    }

    pub fn literal_value(&self) -> Option<&Object> {
        self.value.as_literal()
    }

    fn optimize(&mut self) {
        if let Some(key) = &mut self.key {
            optimize_in_place(key);
        }
        optimize_in_place(&mut self.value);
        self.cloneable = is_literal(self.value.as_ref());
    }

    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        if let Some(key) = &mut self.key {
            key.init(cfg)?;
        }
        if let Err(err) = self.value.init(cfg) {
            if let Some(key) = &mut self.key {
                key.deinit(cfg);
            }
            return Err(err);
        }
        Ok(())
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        if let Some(key) = &mut self.key {
            key.deinit(cfg);
        }
        self.value.deinit(cfg);
    }
}

/// Borrowed view over a literal generator's elements, used by callers that
/// inspect the body without evaluating it.
pub struct LiteralGeneratorView<'a> {
    kind: ContainerKind,
    elements: &'a [GenElem],
}

impl<'a> LiteralGeneratorView<'a> {
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a GenElem> {
        self.elements.iter()
    }
}

fn optimize_elements(elements: &mut [GenElem]) {
    for elem in elements {
        elem.optimize();
    }
}

/// Initializes elements in order, rolling back the already-initialized
/// prefix when one fails.
fn init_elements(elements: &mut [GenElem], cfg: &GlobalConfig) -> Result<(), InitError> {
    for i in 0..elements.len() {
        if let Err(err) = elements[i].init(cfg) {
            for elem in &mut elements[..i] {
                elem.deinit(cfg);
            }
            return Err(err);
        }
    }
    Ok(())
}

fn deinit_elements(elements: &mut [GenElem], cfg: &GlobalConfig) {
    for elem in elements {
        elem.deinit(cfg);
    }
}

/// Evaluates each element and stores it into `fillable`. Keyed elements set
/// the key, bare elements append. The first failing element aborts the fill.
fn eval_elements(
    elements: &[GenElem],
    ctx: &mut EvalContext<'_>,
    fillable: &Object,
    location: Option<&ExprLocation>,
) -> EvalResult<()> {
    for elem in elements {
        let key = match &elem.key {
            Some(key) => Some(evaluate(key.as_ref(), ctx)?),
            None => None,
        };
        let mut value = evaluate(elem.value.as_ref(), ctx)?;
        if elem.cloneable {
            value = value.deep_clone();
        }
        if let Err(err) = fillable.set_subscript(key.as_ref(), value) {
            return Err(ctx.fail(format!("failed to fill container: {err}"), location, None));
        }
    }
    Ok(())
}

/// Literal list/dict expression at the top of a literal body. Owns the
/// fillable slot; nested literal bodies become `InnerLiteralGenerator`
/// elements holding a clone of that slot's handle.
pub struct LiteralGenerator {
    kind: ContainerKind,
    elements: Vec<GenElem>,
    fillable: FillableRef,
    location: Option<ExprLocation>,
}

impl LiteralGenerator {
    pub fn new(kind: ContainerKind, elements: Vec<GenElem>) -> Self {
        Self {
            kind,
            elements,
            fillable: FillableRef::new(),
            location: None,
        }
    }

    /// Appends one element to the body. The parser wires nested bodies in
    /// after the root exists, so it can hand them the root's fillable.
    pub fn add_element(&mut self, elem: GenElem) {
        self.elements.push(elem);
    }

    /// Generator bound to a fresh root container, ready for value position.
    pub fn boxed(kind: ContainerKind, elements: Vec<GenElem>) -> ExprNode {
        let generator = Self::new(kind, elements);
        crate::eval::generator::bind_root_container(&generator);
        Box::new(generator)
    }
}

impl Expr for LiteralGenerator {
    fn name(&self) -> &'static str {
        match self.kind {
            ContainerKind::List => "literal_list",
            ContainerKind::Dict => "literal_dict",
        }
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    fn ignore_falsy_result(&self) -> bool {
        true
    }

    fn optimize(&mut self) -> Option<ExprNode> {
        self.fillable.optimize();
        optimize_elements(&mut self.elements);
        None
    }

    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        self.fillable.init(cfg)?;
        if let Err(err) = init_elements(&mut self.elements, cfg) {
            self.fillable.deinit(cfg);
            return Err(err);
        }
        Ok(())
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        deinit_elements(&mut self.elements, cfg);
        self.fillable.deinit(cfg);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        eval_generator(self, ctx)
    }

    fn literal_generator(&self) -> Option<LiteralGeneratorView<'_>> {
        Some(LiteralGeneratorView {
            kind: self.kind,
            elements: &self.elements,
        })
    }
}

impl GeneratorExpr for LiteralGenerator {
    fn generate(&self, ctx: &mut EvalContext<'_>, fillable: &Object) -> EvalResult<()> {
        eval_elements(&self.elements, ctx, fillable, self.location.as_ref())
    }

    fn container_kind(&self) -> ContainerKind {
        self.kind
    }

    fn fillable(&self) -> &FillableRef {
        &self.fillable
    }
}

/// Literal body nested inside another literal body. Instead of producing a
/// detached container it asks the root's fillable for a child chained to it,
/// fills that child and yields it as the element value.
pub struct InnerLiteralGenerator {
    kind: ContainerKind,
    elements: Vec<GenElem>,
    root_fillable: FillableRef,
    location: Option<ExprLocation>,
}

impl InnerLiteralGenerator {
    pub fn boxed(
        kind: ContainerKind,
        elements: Vec<GenElem>,
        root_fillable: FillableRef,
    ) -> ExprNode {
        Box::new(Self {
            kind,
            elements,
            root_fillable,
            location: None,
        })
    }
}

impl Expr for InnerLiteralGenerator {
    fn name(&self) -> &'static str {
        match self.kind {
            ContainerKind::List => "inner_literal_list",
            ContainerKind::Dict => "inner_literal_dict",
        }
    }

    fn location(&self) -> Option<&ExprLocation> {
        self.location.as_ref()
    }

    fn set_location(&mut self, location: ExprLocation) {
        self.location = Some(location);
    }

    fn ignore_falsy_result(&self) -> bool {
        true
    }

    fn optimize(&mut self) -> Option<ExprNode> {
        optimize_elements(&mut self.elements);
        None
    }

    // The shared fillable slot is initialized by the root generator; only
    // this body's own elements are handled here.
    fn init(&mut self, cfg: &GlobalConfig) -> Result<(), InitError> {
        init_elements(&mut self.elements, cfg)
    }

    fn deinit(&mut self, cfg: &GlobalConfig) {
        deinit_elements(&mut self.elements, cfg);
    }

    fn eval(&self, ctx: &mut EvalContext<'_>) -> EvalResult {
        let root = self.root_fillable.eval(ctx)?;
        let child = self.kind.create_child(&root).ok_or_else(|| {
            ctx.fail(
                "cannot create container: parent is not a container",
                self.location.as_ref(),
                Some(&root),
            )
        })?;
        eval_elements(&self.elements, ctx, &child, self.location.as_ref())?;
        Ok(child)
    }

    fn literal_generator(&self) -> Option<LiteralGeneratorView<'_>> {
        Some(LiteralGeneratorView {
            kind: self.kind,
            elements: &self.elements,
        })
    }
}
