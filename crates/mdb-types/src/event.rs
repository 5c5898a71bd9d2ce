use facet::Facet;
use std::fmt;

/// The causal relation an edge (or an annotation) stands for.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum EventKind {
    // Template activations.
    TemplateInstantiation,
    Memoization,
    DefaultTemplateArgumentInstantiation,
    DefaultFunctionArgumentInstantiation,
    ExplicitTemplateArgumentSubstitution,
    DeducedTemplateArgumentSubstitution,
    PriorTemplateArgumentSubstitution,
    ExceptionSpecInstantiation,
    DeclaringSpecialMember,
    DefiningSynthesizedFunction,
    MarkingAsUsed,

    // Preprocessor activations.
    MacroExpansion,
    QuoteInclude,
    SysInclude,
    PreprocessingCondition,

    // Point events. These never open an activation.
    Rescanning,
    ExpandedCode,
    GeneratedToken,
    SkippedToken,
    MacroDefinition,
    MacroDeletion,
    PreprocessingConditionResult,
    PreprocessingElse,
    PreprocessingEndif,
    ErrorDirective,
    LineDirective,
}

/// Coarse grouping of activation kinds, used by edge filters.
#[derive(Facet, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum EventCategory {
    Template,
    Preprocessor,
    Annotation,
}

impl EventKind {
    pub fn category(self) -> EventCategory {
        use EventKind::*;
        match self {
            TemplateInstantiation
            | Memoization
            | DefaultTemplateArgumentInstantiation
            | DefaultFunctionArgumentInstantiation
            | ExplicitTemplateArgumentSubstitution
            | DeducedTemplateArgumentSubstitution
            | PriorTemplateArgumentSubstitution
            | ExceptionSpecInstantiation
            | DeclaringSpecialMember
            | DefiningSynthesizedFunction
            | MarkingAsUsed => EventCategory::Template,
            MacroExpansion | QuoteInclude | SysInclude | PreprocessingCondition => {
                EventCategory::Preprocessor
            }
            Rescanning
            | ExpandedCode
            | GeneratedToken
            | SkippedToken
            | MacroDefinition
            | MacroDeletion
            | PreprocessingConditionResult
            | PreprocessingElse
            | PreprocessingEndif
            | ErrorDirective
            | LineDirective => EventCategory::Annotation,
        }
    }

    pub fn is_template(self) -> bool {
        self.category() == EventCategory::Template
    }

    /// True for kinds that are delimited by a begin and an end event.
    pub fn is_activation(self) -> bool {
        self.category() != EventCategory::Annotation
    }

    pub fn is_include(self) -> bool {
        matches!(self, Self::QuoteInclude | Self::SysInclude)
    }

    pub fn as_str(self) -> &'static str {
        use EventKind::*;
        match self {
            TemplateInstantiation => "TemplateInstantiation",
            Memoization => "Memoization",
            DefaultTemplateArgumentInstantiation => "DefaultTemplateArgumentInstantiation",
            DefaultFunctionArgumentInstantiation => "DefaultFunctionArgumentInstantiation",
            ExplicitTemplateArgumentSubstitution => "ExplicitTemplateArgumentSubstitution",
            DeducedTemplateArgumentSubstitution => "DeducedTemplateArgumentSubstitution",
            PriorTemplateArgumentSubstitution => "PriorTemplateArgumentSubstitution",
            ExceptionSpecInstantiation => "ExceptionSpecInstantiation",
            DeclaringSpecialMember => "DeclaringSpecialMember",
            DefiningSynthesizedFunction => "DefiningSynthesizedFunction",
            MarkingAsUsed => "MarkingAsUsed",
            MacroExpansion => "MacroExpansion",
            QuoteInclude => "QuoteInclude",
            SysInclude => "SysInclude",
            PreprocessingCondition => "PreprocessingCondition",
            Rescanning => "Rescanning",
            ExpandedCode => "ExpandedCode",
            GeneratedToken => "GeneratedToken",
            SkippedToken => "SkippedToken",
            MacroDefinition => "MacroDefinition",
            MacroDeletion => "MacroDeletion",
            PreprocessingConditionResult => "PreprocessingConditionResult",
            PreprocessingElse => "PreprocessingElse",
            PreprocessingEndif => "PreprocessingEndif",
            ErrorDirective => "ErrorDirective",
            LineDirective => "LineDirective",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_begin_end_kinds_are_activations() {
        assert!(EventKind::Memoization.is_activation());
        assert!(EventKind::SysInclude.is_activation());
        assert!(EventKind::PreprocessingCondition.is_activation());
        assert!(!EventKind::GeneratedToken.is_activation());
        assert!(!EventKind::Rescanning.is_activation());
        assert!(!EventKind::PreprocessingEndif.is_activation());
    }

    #[test]
    fn template_kinds_are_template_category() {
        assert!(EventKind::DeducedTemplateArgumentSubstitution.is_template());
        assert!(!EventKind::MacroExpansion.is_template());
        assert_eq!(
            EventKind::QuoteInclude.category(),
            EventCategory::Preprocessor
        );
    }
}
