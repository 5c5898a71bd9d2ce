use facet::Facet;

use crate::{CppCode, EvaluationResult, EventKind, FileLocation, IncludeArgument, Token, Type};

/// One instrumentation event, as delivered by the compiler integration.
///
/// Timestamps are seconds on the compiler's clock. Events arrive in true
/// temporal order; every `Begin*` is closed by the matching `End*`.
#[derive(Facet, Debug, Clone, PartialEq)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum TraceEvent {
    BeginTemplate {
        kind: EventKind,
        ty: Type,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    },
    EndTemplate {
        timestamp: f64,
    },
    BeginMacroExpansion {
        name: CppCode,
        args: Option<Vec<CppCode>>,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    },
    Rescanning {
        code: CppCode,
        timestamp: f64,
    },
    ExpandedCode {
        code: CppCode,
        point_of_event: FileLocation,
        timestamp: f64,
    },
    EndMacroExpansion {
        timestamp: f64,
    },
    TokenGenerated {
        token: Token,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    },
    TokenSkipped {
        token: Token,
        point_of_event: FileLocation,
        timestamp: f64,
    },
    BeginInclude {
        arg: IncludeArgument,
        point_of_event: FileLocation,
        timestamp: f64,
    },
    EndInclude {
        timestamp: f64,
    },
    Define {
        name: CppCode,
        args: Option<Vec<CppCode>>,
        body: CppCode,
        point_of_event: FileLocation,
        timestamp: f64,
    },
    Undefine {
        name: CppCode,
        point_of_event: FileLocation,
        timestamp: f64,
    },
    BeginPreprocessingCondition {
        expression: CppCode,
        point_of_event: FileLocation,
        timestamp: f64,
    },
    EndPreprocessingCondition {
        result: bool,
        timestamp: f64,
    },
    PreprocessingElse {
        point_of_event: FileLocation,
        timestamp: f64,
    },
    PreprocessingEndif {
        point_of_event: FileLocation,
        timestamp: f64,
    },
    ErrorDirective {
        message: String,
        point_of_event: FileLocation,
        timestamp: f64,
    },
    LineDirective {
        arg: CppCode,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    },
    EvaluationEnd {
        result: EvaluationResult,
    },
}

impl TraceEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeginTemplate { .. } => "begin_template",
            Self::EndTemplate { .. } => "end_template",
            Self::BeginMacroExpansion { .. } => "begin_macro_expansion",
            Self::Rescanning { .. } => "rescanning",
            Self::ExpandedCode { .. } => "expanded_code",
            Self::EndMacroExpansion { .. } => "end_macro_expansion",
            Self::TokenGenerated { .. } => "token_generated",
            Self::TokenSkipped { .. } => "token_skipped",
            Self::BeginInclude { .. } => "begin_include",
            Self::EndInclude { .. } => "end_include",
            Self::Define { .. } => "define",
            Self::Undefine { .. } => "undefine",
            Self::BeginPreprocessingCondition { .. } => "begin_preprocessing_condition",
            Self::EndPreprocessingCondition { .. } => "end_preprocessing_condition",
            Self::PreprocessingElse { .. } => "preprocessing_else",
            Self::PreprocessingEndif { .. } => "preprocessing_endif",
            Self::ErrorDirective { .. } => "error_directive",
            Self::LineDirective { .. } => "line_directive",
            Self::EvaluationEnd { .. } => "evaluation_end",
        }
    }

    /// Shorthand for an ordinary template instantiation begin event.
    pub fn begin_template(
        ty: impl Into<Type>,
        point_of_event: FileLocation,
        source_location: FileLocation,
        timestamp: f64,
    ) -> Self {
        Self::BeginTemplate {
            kind: EventKind::TemplateInstantiation,
            ty: ty.into(),
            point_of_event,
            source_location,
            timestamp,
        }
    }

    pub fn end_template(timestamp: f64) -> Self {
        Self::EndTemplate { timestamp }
    }
}
