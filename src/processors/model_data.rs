use crate::ParserSettings;
use crate::err::{OpxmlError, Result};
use crate::model::{CallData, ModelData, ModelImage, ModelSample, ModelSymbol, OpxmlDocument};
use crate::processor::{Attributes, Processor, TextBuffer, Transition};
use crate::processors::{parse_number, unknown_element};

const MODELDATA_TAG: &str = "model-data";
const IMAGE_TAG: &str = "image";
const DEPENDENT_TAG: &str = "dependent";
const SYMBOLS_TAG: &str = "symbols";
const SYMBOL_TAG: &str = "symbol";
const SAMPLE_TAG: &str = "sample";
const ADDR_TAG: &str = "addr";
const COUNT_TAG: &str = "count";
const LINE_TAG: &str = "line";

const NAME_ATTR: &str = "name";
const COUNT_ATTR: &str = "count";
const FILE_ATTR: &str = "file";
const LINE_ATTR: &str = "line";

/// Location of an image in the tree: the index of the top level image, then the index of
/// each dependent on the way down.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImagePath {
    root: usize,
    dependents: Vec<usize>,
}

impl ImagePath {
    fn child(&self, index: usize) -> ImagePath {
        let mut dependents = self.dependents.clone();
        dependents.push(index);
        ImagePath {
            root: self.root,
            dependents,
        }
    }

    fn resolve<'d>(&self, data: &'d mut CallData) -> Result<&'d mut ModelImage> {
        ModelData::from_call_data_mut(data)?
            .images
            .get_mut(self.root)
            .and_then(|image| image.descend_mut(&self.dependents))
            .ok_or_else(|| OpxmlError::malformed("image processor lost track of its image"))
    }
}

fn image_from(attributes: &Attributes) -> Result<ModelImage> {
    Ok(ModelImage {
        name: attributes.get(NAME_ATTR).unwrap_or_default().to_string(),
        count: optional_count(attributes)?.unwrap_or(0),
        ..ModelImage::default()
    })
}

fn symbol_from(attributes: &Attributes) -> Result<ModelSymbol> {
    Ok(ModelSymbol {
        name: attributes.get(NAME_ATTR).unwrap_or_default().to_string(),
        file: attributes.get(FILE_ATTR).map(str::to_string),
        line: attributes
            .get(LINE_ATTR)
            .map(|line| parse_scalar!(line, LINE_ATTR))
            .transpose()?,
        count: optional_count(attributes)?.unwrap_or(0),
        samples: Vec::new(),
    })
}

fn optional_count(attributes: &Attributes) -> Result<Option<u64>> {
    attributes
        .get(COUNT_ATTR)
        .map(|count| parse_scalar!(count, COUNT_ATTR))
        .transpose()
}

/// Builds a [`ModelData`] from a `<model-data>` document.
///
/// ```xml
/// <model-data>
///   <image name="/usr/bin/app">
///     <symbol name="main" file="main.c" line="10">
///       <sample><addr>0x401000</addr><count>3</count><line>12</line></sample>
///     </symbol>
///     <dependent>
///       <image name="/lib/libc.so.6">...</image>
///     </dependent>
///   </image>
/// </model-data>
/// ```
///
/// Every `<image>` is handed to an [`ImageProcessor`], which hands every `<symbol>` to a
/// [`SymbolProcessor`]. Counts are summed when the symbol and the image close.
#[derive(Debug, Default)]
pub struct ModelDataProcessor {
    settings: ParserSettings,
}

impl ModelDataProcessor {
    pub fn new(settings: &ParserSettings) -> Self {
        ModelDataProcessor {
            settings: settings.clone(),
        }
    }

    pub fn boxed(settings: &ParserSettings) -> Box<dyn Processor> {
        Box::new(ModelDataProcessor::new(settings))
    }
}

impl Processor for ModelDataProcessor {
    fn reset(&mut self, data: &mut CallData) -> Result<()> {
        ModelData::from_call_data_mut(data)?.images.clear();
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        attributes: &Attributes,
        data: &mut CallData,
    ) -> Result<Transition> {
        match name {
            MODELDATA_TAG => Ok(Transition::Continue),
            IMAGE_TAG => {
                let model = ModelData::from_call_data_mut(data)?;
                model.images.push(image_from(attributes)?);
                let path = ImagePath {
                    root: model.images.len() - 1,
                    dependents: Vec::new(),
                };
                Ok(Transition::Push(Box::new(ImageProcessor::new(
                    &self.settings,
                    path,
                ))))
            }
            other => {
                unknown_element(self.settings.is_strict(), "model-data", other)?;
                Ok(Transition::Continue)
            }
        }
    }

    fn end_element(&mut self, _name: &str, _data: &mut CallData) -> Result<Transition> {
        // `</image>` arrives here after the image processor popped; nothing is left to do.
        Ok(Transition::Continue)
    }

    fn characters(&mut self, _text: &str, _data: &mut CallData) -> Result<()> {
        Ok(())
    }
}

/// Handles the content of one `<image>`: its symbols and its dependent images.
#[derive(Debug)]
pub struct ImageProcessor {
    settings: ParserSettings,
    path: ImagePath,
    in_dependent: bool,
}

impl ImageProcessor {
    fn new(settings: &ParserSettings, path: ImagePath) -> Self {
        ImageProcessor {
            settings: settings.clone(),
            path,
            in_dependent: false,
        }
    }
}

impl Processor for ImageProcessor {
    fn reset(&mut self, data: &mut CallData) -> Result<()> {
        self.path.resolve(data)?;
        self.in_dependent = false;
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        attributes: &Attributes,
        data: &mut CallData,
    ) -> Result<Transition> {
        match name {
            SYMBOLS_TAG => Ok(Transition::Continue),
            SYMBOL_TAG => {
                let image = self.path.resolve(data)?;
                image.symbols.push(symbol_from(attributes)?);
                let index = image.symbols.len() - 1;
                Ok(Transition::Push(Box::new(SymbolProcessor::new(
                    &self.settings,
                    self.path.clone(),
                    index,
                ))))
            }
            DEPENDENT_TAG => {
                self.in_dependent = true;
                Ok(Transition::Continue)
            }
            IMAGE_TAG if self.in_dependent => {
                let image = self.path.resolve(data)?;
                image.dependents.push(image_from(attributes)?);
                let path = self.path.child(image.dependents.len() - 1);
                Ok(Transition::Push(Box::new(ImageProcessor::new(
                    &self.settings,
                    path,
                ))))
            }
            IMAGE_TAG => Err(OpxmlError::malformed(
                "`<image>` nested in an image outside of `<dependent>`",
            )),
            other => {
                unknown_element(self.settings.is_strict(), "image", other)?;
                Ok(Transition::Continue)
            }
        }
    }

    fn end_element(&mut self, name: &str, data: &mut CallData) -> Result<Transition> {
        match name {
            DEPENDENT_TAG => self.in_dependent = false,
            // A dependent image closed and popped back to us.
            IMAGE_TAG if self.in_dependent => {}
            IMAGE_TAG => {
                self.path.resolve(data)?.aggregate();
                return Ok(Transition::Pop);
            }
            _ => {}
        }
        Ok(Transition::Continue)
    }

    fn characters(&mut self, _text: &str, _data: &mut CallData) -> Result<()> {
        Ok(())
    }
}

/// Collects the samples of one `<symbol>`.
#[derive(Debug)]
pub struct SymbolProcessor {
    strict: bool,
    image: ImagePath,
    index: usize,
    sample: Option<ModelSample>,
    text: TextBuffer,
}

impl SymbolProcessor {
    fn new(settings: &ParserSettings, image: ImagePath, index: usize) -> Self {
        SymbolProcessor {
            strict: settings.is_strict(),
            image,
            index,
            sample: None,
            text: TextBuffer::default(),
        }
    }

    fn symbol<'d>(&self, data: &'d mut CallData) -> Result<&'d mut ModelSymbol> {
        self.image
            .resolve(data)?
            .symbols
            .get_mut(self.index)
            .ok_or_else(|| OpxmlError::malformed("symbol processor lost track of its symbol"))
    }

    fn sample_mut(&mut self, tag: &str) -> Result<&mut ModelSample> {
        self.sample
            .as_mut()
            .ok_or_else(|| OpxmlError::malformed(format!("`<{}>` outside of `<sample>`", tag)))
    }
}

impl Processor for SymbolProcessor {
    fn reset(&mut self, data: &mut CallData) -> Result<()> {
        self.symbol(data)?.samples.clear();
        self.sample = None;
        self.text.clear();
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        _attributes: &Attributes,
        _data: &mut CallData,
    ) -> Result<Transition> {
        self.text.clear();

        match name {
            SAMPLE_TAG => self.sample = Some(ModelSample::default()),
            ADDR_TAG | COUNT_TAG | LINE_TAG => {}
            // Its end tag would pop this processor and strand the remaining samples.
            SYMBOL_TAG => return Err(OpxmlError::malformed("`<symbol>` nested in a symbol")),
            other => unknown_element(self.strict, "symbol", other)?,
        }
        Ok(Transition::Continue)
    }

    fn end_element(&mut self, name: &str, data: &mut CallData) -> Result<Transition> {
        let text = self.text.take();

        match name {
            ADDR_TAG => self.sample_mut(ADDR_TAG)?.addr = parse_number(ADDR_TAG, &text)?,
            COUNT_TAG => self.sample_mut(COUNT_TAG)?.count = parse_scalar!(text, COUNT_TAG)?,
            LINE_TAG => self.sample_mut(LINE_TAG)?.line = Some(parse_scalar!(text, LINE_TAG)?),
            SAMPLE_TAG => {
                if let Some(sample) = self.sample.take() {
                    self.symbol(data)?.samples.push(sample);
                }
            }
            SYMBOL_TAG => {
                self.symbol(data)?.aggregate();
                return Ok(Transition::Pop);
            }
            _ => {}
        }
        Ok(Transition::Continue)
    }

    fn characters(&mut self, text: &str, _data: &mut CallData) -> Result<()> {
        self.text.push(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::ModelData;
    use crate::{ErrorKind, OpxmlParser, ParserSettings};
    use pretty_assertions::assert_eq;

    fn parse(xml: &str) -> ModelData {
        OpxmlParser::default()
            .parse_as::<ModelData, _>(xml.as_bytes())
            .expect("model-data document")
    }

    #[test]
    fn test_counts_are_summed_from_samples() {
        let data = parse(
            r#"<model-data>
                 <image name="/usr/bin/app">
                   <symbols>
                     <symbol name="main" file="main.c" line="10">
                       <sample><addr>0x401000</addr><count>3</count><line>12</line></sample>
                       <sample><addr>0x401010</addr><count>5</count></sample>
                     </symbol>
                     <symbol name="helper">
                       <sample><addr>0x402000</addr><count>2</count></sample>
                       <sample><addr>0x402008</addr><count>2</count></sample>
                     </symbol>
                   </symbols>
                 </image>
               </model-data>"#,
        );

        let image = &data.images[0];
        assert_eq!(image.name, "/usr/bin/app");
        assert_eq!(
            image.symbols.iter().map(|s| s.count).collect::<Vec<_>>(),
            vec![8, 4]
        );
        assert_eq!(image.count, 12);

        let main = &image.symbols[0];
        assert_eq!(main.file.as_deref(), Some("main.c"));
        assert_eq!(main.line, Some(10));
        assert_eq!(main.samples[0].addr, 0x401000);
        assert_eq!(main.samples[0].line, Some(12));
        assert_eq!(main.samples[1].line, None);
    }

    #[test]
    fn test_dependents_nest_under_their_image() {
        let data = parse(
            r#"<model-data>
                 <image name="/usr/bin/app">
                   <symbol name="main" count="4"/>
                   <dependent>
                     <image name="/lib/libc.so.6">
                       <symbol name="memcpy" count="7"/>
                       <dependent>
                         <image name="/lib/ld.so" count="1"/>
                       </dependent>
                     </image>
                     <image name="/lib/libm.so.6" count="2"/>
                   </dependent>
                 </image>
                 <image name="/boot/vmlinux" count="30"/>
               </model-data>"#,
        );

        assert_eq!(data.images.len(), 2);
        let app = &data.images[0];
        assert_eq!(app.count, 4);
        assert_eq!(
            app.dependents.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            vec!["/lib/libc.so.6", "/lib/libm.so.6"]
        );
        assert_eq!(app.dependents[0].count, 7);
        assert_eq!(app.dependents[0].dependents[0].name, "/lib/ld.so");
        assert_eq!(app.total_count(), 4 + 7 + 1 + 2);
        assert_eq!(data.total_count(), 14 + 30);
    }

    #[test]
    fn test_attribute_counts_are_kept_without_children() {
        let data = parse(r#"<model-data><image name="a" count="20"><symbols/></image></model-data>"#);
        assert_eq!(data.images[0].count, 20);
        assert!(data.images[0].symbols.is_empty());
    }

    #[test]
    fn test_image_outside_dependent_is_malformed() {
        let err = OpxmlParser::default()
            .parse_str(r#"<model-data><image name="a"><image name="b"/></image></model-data>"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn test_nested_symbol_is_malformed() {
        let err = OpxmlParser::default()
            .parse_str(
                r#"<model-data><image name="a"><symbol name="s">
                     <symbol name="t"/>
                     <sample><addr>1</addr><count>5</count></sample>
                   </symbol></image></model-data>"#,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);
    }

    #[test]
    fn test_bad_sample_count_is_rejected() {
        let err = OpxmlParser::default()
            .parse_str(
                r#"<model-data><image name="a"><symbol name="s">
                     <sample><addr>0x1</addr><count>many</count></sample>
                   </symbol></image></model-data>"#,
            )
            .unwrap_err();
        assert!(err.to_string().contains("count"), "{}", err);
    }

    #[test]
    fn test_unknown_elements_are_skipped_unless_strict() {
        let xml = r#"<model-data><image name="a"><symbol name="s" count="1"><note/></symbol></image></model-data>"#;
        assert_eq!(parse(xml).images[0].count, 1);

        let strict = OpxmlParser::default().with_configuration(ParserSettings::new().strict(true));
        assert!(strict.parse_str(xml).is_err());
    }
}
