//! Input slots: the editable spots of a document for the visual overlay.
//!
//! Every expression in a value position (call argument, right-hand side,
//! condition, ...) is classified into a [`SlotKind::Value`] slot; assigned
//! variables become [`SlotKind::Address`] slots. Only a small set of forms
//! qualify: literals, identifiers, signed literals, negated booleans and color
//! constructor calls with literal arguments.

use serde::Serialize;
use text_size::TextRange;

use super::completion::{is_hidden, resource_sprite};
use super::document;
use crate::base::Span;
use crate::error::RequestError;
use crate::hir::domain::{ENGINE_PACKAGE, EnumDomain, color_constructor};
use crate::hir::{ConstValue, Model, ProgramUnit, SymbolKind, Type, UnitFile};
use crate::parser::{AstNode, CallLike, Expr, LiteralKind, SyntaxKind, SyntaxNode, UnaryExpr};
use crate::resource::ResourceKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotKind {
    /// A value the user may replace
    Value,
    /// A variable being assigned
    Address,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InputKind {
    /// The value is written out in the source
    InPlace,
    /// The value comes from a named variable, constant or function
    Predefined,
}

/// Semantic type of an input, as the overlay edits it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InputType {
    Integer,
    Decimal,
    String,
    Boolean,
    ResourceName,
    Direction,
    Color,
    EffectKind,
    Key,
    SpecialObj,
    RotationStyle,
    PlayAction,
    Unknown,
}

impl InputType {
    fn of_domain(domain: EnumDomain) -> Self {
        match domain {
            EnumDomain::Direction => Self::Direction,
            EnumDomain::Key => Self::Key,
            EnumDomain::RotationStyle => Self::RotationStyle,
            EnumDomain::SpecialObj => Self::SpecialObj,
            EnumDomain::EffectKind => Self::EffectKind,
            EnumDomain::PlayAction => Self::PlayAction,
        }
    }

    /// Input type for values of `ty`.
    pub fn of(model: &Model, ty: &Type) -> Self {
        if model.resource_name_kind(ty).is_some() {
            return Self::ResourceName;
        }
        if let Some(domain) = model.enum_domain(ty) {
            return Self::of_domain(domain);
        }
        if model.is_engine_type(ty, "Color") {
            return Self::Color;
        }
        match model.basic_of(ty) {
            Some(kind) if kind.is_boolean() => Self::Boolean,
            Some(kind) if kind.is_integer() => Self::Integer,
            Some(kind) if kind.is_numeric() => Self::Decimal,
            Some(kind) if kind.is_string() => Self::String,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorValue {
    /// Constructor function, e.g. `HSB`
    pub constructor: String,
    pub args: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum InputValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    /// Engine constant written by name, e.g. `KeyA`
    Constant(String),
    Color(ColorValue),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Input {
    pub kind: InputKind,
    #[serde(rename = "type")]
    pub ty: InputType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<InputValue>,
    /// Referenced name of a predefined input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Input {
    fn in_place(ty: InputType, value: InputValue) -> Self {
        Self {
            kind: InputKind::InPlace,
            ty,
            value: Some(value),
            name: None,
        }
    }

    fn predefined(ty: InputType, name: impl Into<String>) -> Self {
        Self {
            kind: InputKind::Predefined,
            ty,
            value: None,
            name: Some(name.into()),
        }
    }
}

/// Resources a resource-name slot may refer to
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceContext {
    pub kind: ResourceKind,
    /// Owning sprite for costumes and animations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAccept {
    #[serde(rename = "type")]
    pub ty: InputType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_context: Option<ResourceContext>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputSlot {
    pub kind: SlotKind,
    pub accept: SlotAccept,
    pub input: Input,
    /// Names that could replace the current input
    pub predefined_names: Vec<String>,
    pub span: Span,
}

/// Input slots of the document at `path`, ordered by position then kind.
pub fn input_slots(unit: &ProgramUnit, path: &str) -> Result<Vec<InputSlot>, RequestError> {
    let file = document(unit, path)?;
    let cx = SlotCx { unit, file };
    let mut taken: Vec<(TextRange, InputSlot)> = Vec::new();
    for node in file.syntax().descendants() {
        let Some(kind) = slot_kind(&node) else {
            continue;
        };
        let range = node.text_range();
        if taken.iter().any(|(other, _)| overlaps(*other, range)) {
            continue;
        }
        let slot = match kind {
            SlotKind::Value => cx.value_slot(&node),
            SlotKind::Address => cx.address_slot(&node),
        };
        if let Some(slot) = slot {
            taken.push((range, slot));
        }
    }
    let mut slots: Vec<InputSlot> = taken.into_iter().map(|(_, slot)| slot).collect();
    slots.sort_by_key(|slot| (slot.span.start.line, slot.span.start.column, slot.kind));
    tracing::debug!(path, slots = slots.len(), "input slots");
    Ok(slots)
}

fn overlaps(a: TextRange, b: TextRange) -> bool {
    a.start() < b.end() && b.start() < a.end()
}

fn nth_child_is(parent: &SyntaxNode, index: usize, node: &SyntaxNode) -> bool {
    parent.children().nth(index).as_ref() == Some(node)
}

/// Role of an expression node, decided by where it sits.
fn slot_kind(node: &SyntaxNode) -> Option<SlotKind> {
    if !Expr::can_cast(node.kind()) {
        return None;
    }
    let parent = node.parent()?;
    match parent.kind() {
        SyntaxKind::ARG_LIST
        | SyntaxKind::BINARY_EXPR
        | SyntaxKind::LIST_LIT
        | SyntaxKind::LIT_BODY
        | SyntaxKind::SEND_STMT
        | SyntaxKind::IF_STMT
        | SyntaxKind::FOR_STMT
        | SyntaxKind::FOR_CLAUSE
        | SyntaxKind::SWITCH_STMT
        | SyntaxKind::RETURN_STMT
        | SyntaxKind::CASE_CLAUSE
        | SyntaxKind::VAR_SPEC
        | SyntaxKind::CONST_SPEC => Some(SlotKind::Value),
        SyntaxKind::INDEX_EXPR | SyntaxKind::KEYED_ELEMENT => {
            nth_child_is(&parent, 1, node).then_some(SlotKind::Value)
        }
        SyntaxKind::INC_DEC_STMT => Some(SlotKind::Address),
        SyntaxKind::EXPR_LIST => {
            let stmt = parent.parent()?;
            let is_lhs = stmt
                .children()
                .find(|n| n.kind() == SyntaxKind::EXPR_LIST)
                .is_some_and(|first| first == parent);
            match stmt.kind() {
                SyntaxKind::ASSIGN_STMT if is_lhs => Some(SlotKind::Address),
                SyntaxKind::DEFINE_STMT if is_lhs => None,
                SyntaxKind::ASSIGN_STMT
                | SyntaxKind::DEFINE_STMT
                | SyntaxKind::RETURN_STMT
                | SyntaxKind::CASE_CLAUSE
                | SyntaxKind::VAR_SPEC
                | SyntaxKind::CONST_SPEC => Some(SlotKind::Value),
                _ => None,
            }
        }
        _ => None,
    }
}

struct SlotCx<'a> {
    unit: &'a ProgramUnit,
    file: &'a UnitFile,
}

impl SlotCx<'_> {
    fn model(&self) -> &Model {
        self.unit.model()
    }

    fn value_slot(&self, node: &SyntaxNode) -> Option<InputSlot> {
        let expr = Expr::cast(node.clone())?;
        let input = self.classify(&expr)?;
        let info = self.unit.info();
        let accept_ty = info
            .expected_type(self.file.id, node)
            .cloned()
            .or_else(|| info.type_of(self.file.id, node).map(|tv| tv.ty.clone()))
            .unwrap_or(Type::Invalid);
        Some(self.slot(SlotKind::Value, node, &accept_ty, input))
    }

    fn address_slot(&self, node: &SyntaxNode) -> Option<InputSlot> {
        let Expr::NameRef(name) = Expr::cast(node.clone())?.unparen() else {
            return None;
        };
        let ident = name.ident()?;
        let id = self.unit.info().use_at(self.file.id, ident.text_range())?;
        let symbol = self.model().symbol(id);
        if !matches!(symbol.kind, SymbolKind::Var | SymbolKind::Param | SymbolKind::Field) {
            return None;
        }
        let ty = symbol.ty.clone();
        let input = Input::predefined(InputType::of(self.model(), &ty), symbol.name.as_str());
        Some(self.slot(SlotKind::Address, node, &ty, input))
    }

    fn slot(&self, kind: SlotKind, node: &SyntaxNode, accept_ty: &Type, input: Input) -> InputSlot {
        let model = self.model();
        let resource_context = model.resource_name_kind(accept_ty).map(|kind| ResourceContext {
            kind,
            sprite: kind
                .is_sprite_scoped()
                .then(|| resource_sprite(self.unit, self.file, node))
                .flatten()
                .map(|sprite| sprite.to_string()),
        });
        InputSlot {
            kind,
            accept: SlotAccept {
                ty: InputType::of(model, accept_ty),
                resource_context,
            },
            input,
            predefined_names: self.predefined_names(node, accept_ty, kind == SlotKind::Address),
            span: self.file.line_index.span(node.text_range()),
        }
    }

    /// Visible names whose values fit `accept_ty`.
    fn predefined_names(&self, node: &SyntaxNode, accept_ty: &Type, address: bool) -> Vec<String> {
        if accept_ty.is_invalid() {
            return Vec::new();
        }
        let model = self.model();
        let offset = node.text_range().start();
        let scope = model
            .innermost_scope_at(self.file.id, offset)
            .unwrap_or_else(|| model.unit_scope());
        let mut names = Vec::new();
        for id in model.visible_symbols(scope, Some(offset)) {
            let symbol = model.symbol(id);
            // Universe names such as `true` are edited in place.
            if is_hidden(symbol) || (symbol.is_builtin() && symbol.package.is_empty()) {
                continue;
            }
            let fits = match symbol.kind {
                SymbolKind::Var | SymbolKind::Param | SymbolKind::Field => {
                    model.assignable(&symbol.ty, accept_ty)
                }
                SymbolKind::Const if !address => model.assignable(&symbol.ty, accept_ty),
                SymbolKind::Func | SymbolKind::Method if !address => {
                    symbol.signatures.iter().any(|sig| {
                        sig.params.is_empty()
                            && sig.results.len() == 1
                            && model.assignable(&sig.results[0], accept_ty)
                    })
                }
                _ => false,
            };
            if fits {
                names.push(symbol.name.to_string());
            }
        }
        names
    }

    fn classify(&self, expr: &Expr) -> Option<Input> {
        match expr.clone().unparen() {
            Expr::Literal(_) => self.literal(expr),
            Expr::NameRef(_) => self.identifier(expr),
            Expr::Unary(unary) => self.unary(&unary),
            Expr::Call(call) => self.color(&CallLike::Call(call)),
            _ => None,
        }
    }

    fn literal(&self, expr: &Expr) -> Option<Input> {
        let Expr::Literal(lit) = expr.clone().unparen() else {
            return None;
        };
        let value = self.unit.info().type_of(self.file.id, lit.syntax())?.value.clone()?;
        match (lit.kind()?, value) {
            (LiteralKind::Int, ConstValue::Int(v)) => Some(Input::in_place(InputType::Integer, InputValue::Int(v))),
            // An int literal at a float parameter is converted by the checker
            (LiteralKind::Int, ConstValue::Float(v)) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                Some(Input::in_place(InputType::Integer, InputValue::Int(v as i64)))
            }
            (LiteralKind::Float, value) => Some(Input::in_place(InputType::Decimal, InputValue::Float(value.as_f64()?))),
            (LiteralKind::String, ConstValue::String(s)) => {
                Some(Input::in_place(InputType::String, InputValue::String(s.to_string())))
            }
            _ => None,
        }
    }

    fn identifier(&self, expr: &Expr) -> Option<Input> {
        let Expr::NameRef(name) = expr.clone().unparen() else {
            return None;
        };
        let model = self.model();
        let id = self.unit.info().use_at(self.file.id, name.ident()?.text_range())?;
        let symbol = model.symbol(id);
        if symbol.kind == SymbolKind::Const {
            if let Some(ConstValue::Bool(v)) = symbol.value {
                return Some(Input::in_place(InputType::Boolean, InputValue::Bool(v)));
            }
            if symbol.is_builtin()
                && let Some(domain) = model.enum_domain(&symbol.ty)
            {
                let value = if domain.is_numeric() {
                    match symbol.value.as_ref()? {
                        ConstValue::Int(v) => InputValue::Int(*v),
                        ConstValue::Float(v) => InputValue::Float(*v),
                        _ => return None,
                    }
                } else {
                    InputValue::Constant(symbol.name.to_string())
                };
                return Some(Input::in_place(InputType::of_domain(domain), value));
            }
        }
        match symbol.kind {
            SymbolKind::Var | SymbolKind::Param | SymbolKind::Field | SymbolKind::Const => Some(
                Input::predefined(InputType::of(model, &symbol.ty), symbol.name.as_str()),
            ),
            _ => None,
        }
    }

    fn unary(&self, unary: &UnaryExpr) -> Option<Input> {
        let op = unary.op_kind()?;
        let operand = unary.operand()?;
        let operand_is_literal = matches!(operand.clone().unparen(), Expr::Literal(_));
        let inner = match op {
            SyntaxKind::PLUS | SyntaxKind::MINUS | SyntaxKind::CARET if operand_is_literal => self.literal(&operand)?,
            SyntaxKind::BANG => self.identifier(&operand)?,
            _ => return None,
        };
        if inner.kind != InputKind::InPlace {
            return None;
        }
        let value = match (op, inner.value?) {
            (SyntaxKind::PLUS, value @ (InputValue::Int(_) | InputValue::Float(_))) => value,
            (SyntaxKind::MINUS, InputValue::Int(v)) => InputValue::Int(v.checked_neg()?),
            (SyntaxKind::MINUS, InputValue::Float(v)) => InputValue::Float(-v),
            (SyntaxKind::CARET, InputValue::Int(v)) => InputValue::Int(!v),
            (SyntaxKind::BANG, InputValue::Bool(v)) => InputValue::Bool(!v),
            _ => return None,
        };
        Some(Input::in_place(inner.ty, value))
    }

    /// `HSB(h, s, b)` and `HSBA(h, s, b, a)` with literal arguments.
    fn color(&self, call: &CallLike) -> Option<Input> {
        let Expr::NameRef(callee) = call.callee()?.unparen() else {
            return None;
        };
        let id = self.unit.info().use_at(self.file.id, callee.ident()?.text_range())?;
        let symbol = self.model().symbol(id);
        if symbol.kind != SymbolKind::Func || !symbol.is_builtin() || symbol.package != ENGINE_PACKAGE {
            return None;
        }
        let args = call.args();
        let constructor = color_constructor(&symbol.name, args.len())?;
        let values = args
            .iter()
            .map(|arg| self.numeric_literal(arg))
            .collect::<Option<Vec<f64>>>()?;
        Some(Input::in_place(
            InputType::Color,
            InputValue::Color(ColorValue {
                constructor: constructor.name.to_string(),
                args: values,
            }),
        ))
    }

    fn numeric_literal(&self, arg: &Expr) -> Option<f64> {
        let input = match arg.clone().unparen() {
            Expr::Literal(_) => self.literal(arg)?,
            Expr::Unary(unary) => self.unary(&unary)?,
            _ => return None,
        };
        match input.value? {
            InputValue::Int(v) => Some(v as f64),
            InputValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::base::Position;
    use crate::config::AnalysisConfig;
    use crate::hir::compile;
    use crate::resource::MemoryAssetReader;

    fn slots(files: &[(&str, &str)], path: &str) -> Vec<InputSlot> {
        let files: Vec<(String, String)> = files
            .iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect();
        let assets = MemoryAssetReader::new().with_file(
            "assets/sprites/Fido/index.json",
            r#"{"costumes":[{"name":"jump"}]}"#,
        );
        let unit = compile(files, &assets, &AnalysisConfig::default(), &CancellationToken::new()).unwrap();
        input_slots(&unit, path).unwrap()
    }

    fn sprite_slots(body: &str) -> Vec<InputSlot> {
        let text = format!("onStart => {{\n{body}}}\n");
        slots(&[("main.spx", ""), ("Fido.spx", &text)], "Fido.spx")
    }

    #[test]
    fn test_color_constructor_slot() {
        let slots = sprite_slots("\tsetPenColor HSB(255, 0, 0)\n");
        assert_eq!(slots.len(), 1);
        let slot = &slots[0];
        assert_eq!(slot.kind, SlotKind::Value);
        assert_eq!(slot.accept.ty, InputType::Color);
        assert_eq!(slot.input.kind, InputKind::InPlace);
        assert_eq!(
            slot.input.value,
            Some(InputValue::Color(ColorValue {
                constructor: "HSB".to_string(),
                args: vec![255.0, 0.0, 0.0],
            }))
        );
        assert_eq!(slot.span.start, Position::new(1, 13));
    }

    #[test]
    fn test_color_with_variable_argument_is_not_a_slot() {
        let slots = sprite_slots("\th := 10.0\n\tsetPenColor HSB(h, 0, 0)\n");
        assert!(slots.iter().all(|s| s.accept.ty != InputType::Color));
    }

    #[rstest]
    #[case("\tstep 10\n", InputType::Integer, InputValue::Int(10))]
    #[case("\tstep 2.5\n", InputType::Decimal, InputValue::Float(2.5))]
    #[case("\tsay \"hi\"\n", InputType::String, InputValue::String("hi".to_string()))]
    #[case("\tsetGraphicEffect ColorEffect, 1\n", InputType::EffectKind, InputValue::Constant("ColorEffect".to_string()))]
    fn test_in_place_values(#[case] body: &str, #[case] ty: InputType, #[case] value: InputValue) {
        let slots = sprite_slots(body);
        let slot = &slots[0];
        assert_eq!(slot.input.kind, InputKind::InPlace);
        assert_eq!(slot.input.ty, ty);
        assert_eq!(slot.input.value, Some(value));
    }

    #[rstest]
    #[case("\tchangeSize 5\n", 5)]
    #[case("\tstep 10\n", 10)]
    fn test_int_literal_at_float_parameter(#[case] body: &str, #[case] expected: i64) {
        let slots = sprite_slots(body);
        assert_eq!(slots.len(), 1);
        let slot = &slots[0];
        assert_eq!(slot.accept.ty, InputType::Decimal);
        assert_eq!(slot.input.ty, InputType::Integer);
        assert_eq!(slot.input.value, Some(InputValue::Int(expected)));
    }

    #[test]
    fn test_direction_constants_are_numeric() {
        let slots = sprite_slots("\tsetHeading Right\n");
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].input.ty, InputType::Direction);
        assert!(matches!(
            slots[0].input.value,
            Some(InputValue::Int(90)) | Some(InputValue::Float(_))
        ));
        assert_eq!(slots[0].accept.ty, InputType::Direction);
    }

    #[test]
    fn test_unary_operators() {
        let text = "onStart => {\n\tb := !true\n\tn := -3\n\tprintln b, n\n}\n";
        let slots = slots(&[("main.spx", text)], "main.spx");
        let values: Vec<_> = slots
            .iter()
            .filter(|s| s.input.kind == InputKind::InPlace)
            .map(|s| s.input.value.clone())
            .collect();
        assert_eq!(
            values,
            vec![Some(InputValue::Bool(false)), Some(InputValue::Int(-3))]
        );
    }

    #[test]
    fn test_variables_and_addresses() {
        let text = "var (\n\tspeed int\n)\n\nonStart => {\n\tspeed = 5\n\tlimit := speed\n\tprintln limit\n}\n";
        let slots = slots(&[("main.spx", text)], "main.spx");

        let address = &slots[0];
        assert_eq!(address.kind, SlotKind::Address);
        assert_eq!(address.span.start, Position::new(5, 1));
        assert_eq!(address.input.name.as_deref(), Some("speed"));

        let five = &slots[1];
        assert_eq!(five.kind, SlotKind::Value);
        assert_eq!(five.accept.ty, InputType::Integer);
        assert_eq!(five.input.value, Some(InputValue::Int(5)));
        assert!(five.predefined_names.contains(&"speed".to_string()));

        let reference = &slots[2];
        assert_eq!(reference.input.kind, InputKind::Predefined);
        assert_eq!(reference.input.name.as_deref(), Some("speed"));
    }

    #[test]
    fn test_costume_slot_carries_sprite_context() {
        let slots = sprite_slots("\tsetCostume \"jump\"\n");
        let slot = &slots[0];
        assert_eq!(slot.accept.ty, InputType::ResourceName);
        assert_eq!(
            slot.accept.resource_context,
            Some(ResourceContext {
                kind: ResourceKind::SpriteCostume,
                sprite: Some("Fido".to_string()),
            })
        );
    }

    #[test]
    fn test_slots_are_ordered_and_disjoint() {
        let body = "\tstep 10\n\tsay \"hi\", 2\n\tsetPenColor HSBA(1, 2, 3, 4)\n";
        let first = sprite_slots(body);
        let second = sprite_slots(body);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| {
            (w[0].span.start.line, w[0].span.start.column) <= (w[1].span.start.line, w[1].span.start.column)
                && w[0].span.end <= w[1].span.start
        }));
    }
}
