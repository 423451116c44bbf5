/// Binds a domain result type to its [`CallData`](crate::model::CallData) variant.
macro_rules! impl_opxml_document {
    ($ty: ty, $variant: ident) => {
        impl $crate::model::OpxmlDocument for $ty {
            const KIND: $crate::model::DocumentKind = $crate::model::DocumentKind::$variant;

            fn from_call_data(data: $crate::model::CallData) -> $crate::err::Result<Self> {
                match data {
                    $crate::model::CallData::$variant(inner) => Ok(inner),
                    other => Err($crate::err::OpxmlError::UnexpectedDocument {
                        expected: Self::KIND,
                        found: other.kind(),
                    }),
                }
            }

            fn from_call_data_mut(
                data: &mut $crate::model::CallData,
            ) -> $crate::err::Result<&mut Self> {
                match data {
                    $crate::model::CallData::$variant(inner) => Ok(inner),
                    other => Err($crate::err::OpxmlError::UnexpectedDocument {
                        expected: Self::KIND,
                        found: other.kind(),
                    }),
                }
            }

            fn into_call_data(self) -> $crate::model::CallData {
                $crate::model::CallData::$variant(self)
            }
        }
    };
}

/// Parses the trimmed text of a scalar element, reporting the field name on failure.
macro_rules! parse_scalar {
    ($text: expr, $field: expr) => {{
        let text = $text.trim();
        text.parse()
            .map_err(|_| $crate::err::OpxmlError::invalid_value($field, text))
    }};
}
